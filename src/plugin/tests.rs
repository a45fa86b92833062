use super::*;

use std::fs;

use mockall::*;
use serde_json::{json, Value};

use crate::credentials::{CredentialError, Result as CredentialResult};
use crate::login::{BrowserSurface, LoadHandler, SurfaceLauncher, TextVisitor};
use crate::models::game::{LicenseInfo, LicenseType};
use crate::psn::endpoints::Endpoints;
use crate::psn::{Payload, Request};

mock! {
    pub Transport {}

    #[async_trait]
    impl HttpTransport for Transport {
        async fn get(&self, request: Request) -> Result<Option<Payload>>;
        async fn refresh_cookies(&self, url: &str) -> Result<()>;
    }
}

mock! {
    pub Store {}

    impl CredentialStore for Store {
        fn load(&self) -> CredentialResult<Option<StoredCredentials>>;
        fn store(&self, credentials: &StoredCredentials) -> CredentialResult<()>;
    }
}

const FINISH: &str = "https://psn.test/ssocookie";

/// Lands straight on the finish page showing `page`
#[derive(Clone)]
struct FinishPage {
    page: String,
    current: String,
    closed: bool,
}

impl BrowserSurface for FinishPage {
    fn navigate(&mut self, url: &str) {
        self.current = url.to_string();
    }

    fn current_url(&self) -> String {
        self.current.clone()
    }

    fn get_text(&mut self, visitor: TextVisitor) {
        let page = self.page.clone();
        visitor(self, page);
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn run(&mut self, handler: &mut dyn LoadHandler) {
        self.current = FINISH.to_string();
        handler.on_load_end(self);
    }
}

fn launcher(page: &str) -> SurfaceLauncher<impl Fn() -> FinishPage + Clone + Send + Sync + 'static> {
    let surface = FinishPage { page: page.to_string(), current: String::new(), closed: false };
    SurfaceLauncher(move || surface.clone())
}

fn login_settings() -> LoginSettings {
    LoginSettings { finish_url: FINISH.to_string(), ..LoginSettings::default() }
}

fn fixture(name: &str) -> Payload {
    let data = fs::read_to_string(format!("resources/test/psn/{}", name)).unwrap();
    Payload::Json(serde_json::from_str::<Value>(&data).unwrap())
}

fn expect_query(transport: &mut MockTransport, operation: &'static str, response: Payload) {
    transport
        .expect_get()
        .withf(move |req| req.url.contains(&format!("operationName={}", operation)))
        .returning(move |_| Ok(Some(response.clone())));
}

fn plugin<L: LoginLauncher>(
    transport: MockTransport,
    store: MockStore,
    launcher: L,
) -> (PsnPlugin<MockTransport, MockStore, L>, Arc<CookieJar>) {
    let cookies = Arc::new(CookieJar::new());
    let client = PsnClient::new(transport, Endpoints::default());
    let plugin = PsnPlugin::new(client, cookies.clone(), Arc::new(store), launcher, login_settings());

    (plugin, cookies)
}

fn record(id: &str, name: &str) -> GameRecord {
    GameRecord { title_id: id.to_string(), name: name.to_string() }
}

fn owned(id: &str, name: &str) -> Game {
    Game {
        game_id: id.to_string(),
        game_title: name.to_string(),
        dlcs: vec![],
        license_info: LicenseInfo { license_type: LicenseType::SinglePurchase, owner: None },
    }
}

fn sorted(mut games: Vec<Game>) -> Vec<Game> {
    games.sort_by(|a, b| a.game_id.cmp(&b.game_id));
    games
}

#[test]
fn purchased_names_win_on_merge() {
    let played = vec![record("A", "x")];
    let purchased = vec![record("A", "y"), record("B", "z")];

    let actual = sorted(merge_owned_games(played, purchased));

    assert_eq!(actual, vec![owned("A", "y"), owned("B", "z")]);
}

#[test]
fn merge_keeps_played_only_titles() {
    let actual = sorted(merge_owned_games(vec![record("A", "x"), record("C", "w")], vec![record("B", "z")]));

    assert_eq!(actual, vec![owned("A", "x"), owned("B", "z"), owned("C", "w")]);
}

#[test]
fn merge_of_nothing_is_empty() {
    assert_eq!(merge_owned_games(vec![], vec![]), vec![]);
}

#[tokio::test]
async fn game_times_come_from_played_games() {
    let mut transport = MockTransport::new();
    expect_query(&mut transport, "getUserGameList", fixture("played-games.json"));
    let (plugin, _) = plugin(transport, MockStore::new(), launcher(""));

    let ctx = plugin.prepare_game_times_context(&["GAME_ID_1".to_string()]).await.unwrap();

    assert_eq!(ctx.len(), 3);
    assert_eq!(ctx["GAME_ID_1"].last_played_date_time, "2021-03-06T16:29:22.490Z");
    assert_eq!(
        plugin.get_game_time("GAME_ID_1", &ctx).await.unwrap(),
        GameTime { game_id: "GAME_ID_1".to_string(), time_played: None, last_played_time: Some(1615048162) }
    );
    assert_eq!(
        plugin.get_game_time("GAME_ID_2", &ctx).await.unwrap(),
        GameTime { game_id: "GAME_ID_2".to_string(), time_played: None, last_played_time: Some(1) }
    );
}

#[tokio::test]
async fn unknown_game_has_unknown_time() {
    let (plugin, _) = plugin(MockTransport::new(), MockStore::new(), launcher(""));

    let actual = plugin.get_game_time("NOT_PLAYED", &GameTimeContext::new()).await.unwrap();

    assert_eq!(actual, GameTime { game_id: "NOT_PLAYED".to_string(), time_played: None, last_played_time: None });
}

#[tokio::test]
async fn bad_last_played_time_is_malformed() {
    let (plugin, _) = plugin(MockTransport::new(), MockStore::new(), launcher(""));
    let ctx = GameTimeContext::from([(
        "GAME_ID_1".to_string(),
        PlayedGame {
            title_id: "GAME_ID_1".to_string(),
            name: "CoD".to_string(),
            last_played_date_time: "yesterday".to_string(),
        },
    )]);

    let err = plugin.get_game_time("GAME_ID_1", &ctx).await.unwrap_err();

    assert!(matches!(err, PsnError::MalformedResponse(_)));
}

#[tokio::test]
async fn owned_games_merge_purchased_and_played() {
    let mut transport = MockTransport::new();
    // a total of 3 fits in one default sized page, so only the first page is requested
    expect_query(&mut transport, "getPurchasedGameList", fixture("purchased-games-page-0.json"));
    expect_query(&mut transport, "getUserGameList", fixture("played-games.json"));
    let (plugin, _) = plugin(transport, MockStore::new(), launcher(""));

    let actual = sorted(plugin.get_owned_games().await.unwrap());

    let expected = sorted(vec![
        owned("CUSA00001_00", "Game Buying Simulator 2024"),
        owned("PPSA00002_00", "Final Fantasy MMLXVII"),
        owned("GAME_ID_1", "Call of Duty®: Modern Warfare®"),
        owned("GAME_ID_2", "Call of Duty®: Modern Warfare®"),
    ]);
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn subscriptions_report_plus_membership() {
    let mut transport = MockTransport::new();
    expect_query(&mut transport, "getProfileOracle", fixture("profile.json"));
    let (plugin, _) = plugin(transport, MockStore::new(), launcher(""));

    assert_eq!(
        plugin.get_subscriptions().await.unwrap(),
        vec![Subscription { subscription_name: PLUS_SUBSCRIPTION.to_string(), end_time: None, owned: true }]
    );
}

#[tokio::test]
async fn unknown_subscription_has_no_games() {
    let (plugin, _) = plugin(MockTransport::new(), MockStore::new(), launcher(""));

    assert_eq!(plugin.get_subscription_games("PlayStation NOW").await.unwrap(), vec![]);
}

#[tokio::test]
async fn stored_cookies_authenticate_directly() {
    let mut transport = MockTransport::new();
    transport.expect_refresh_cookies().times(1).returning(|_| Ok(()));
    expect_query(&mut transport, "getProfileOracle", fixture("profile.json"));

    let mut store = MockStore::new();
    store
        .expect_store()
        .withf(|c| c.cookies.get("npsso").map(String::as_str) == Some("stored"))
        .times(1)
        .returning(|_| Ok(()));

    let (mut plugin, cookies) = plugin(transport, store, launcher(""));
    let stored = StoredCredentials::from_cookies(Cookies::from([("npsso".to_string(), "stored".to_string())]));

    let outcome = plugin.authenticate(Some(stored)).await.unwrap();

    assert_eq!(
        outcome,
        AuthOutcome::Authenticated(Authentication {
            user_id: "6584829389210045631".to_string(),
            user_name: "paint_drying_fan".to_string(),
        })
    );
    assert_eq!(cookies.snapshot().get("npsso").map(String::as_str), Some("stored"));
}

#[tokio::test]
async fn empty_account_id_is_invalid_credentials() {
    let mut transport = MockTransport::new();
    transport.expect_refresh_cookies().returning(|_| Ok(()));
    expect_query(
        &mut transport,
        "getProfileOracle",
        Payload::Json(json!({
            "data": { "oracleUserProfileRetrieve": { "accountId": "", "onlineId": "" } }
        })),
    );
    let mut store = MockStore::new();
    store.expect_store().returning(|_| Ok(()));
    let (mut plugin, _) = plugin(transport, store, launcher(""));
    let stored = StoredCredentials::from_cookies(Cookies::from([("npsso".to_string(), "stale".to_string())]));

    let err = plugin.authenticate(Some(stored)).await.unwrap_err();

    assert!(matches!(err, PsnError::InvalidCredentials));
}

fn nothing_saved() -> MockStore {
    let mut store = MockStore::new();
    store.expect_load().returning(|| Ok(None));
    store
}

#[tokio::test]
async fn missing_cookies_start_login() {
    let (mut plugin, _) = plugin(MockTransport::new(), nothing_saved(), launcher(""));

    for stored in [None, Some(StoredCredentials::default())] {
        let outcome = plugin.authenticate(stored).await.unwrap();
        assert_eq!(outcome, AuthOutcome::NextStep(WebSession::default()));
    }
}

#[tokio::test]
async fn login_token_is_stored_and_used() {
    let mut transport = MockTransport::new();
    transport.expect_refresh_cookies().times(1).returning(|_| Ok(()));
    expect_query(&mut transport, "getProfileOracle", fixture("profile.json"));

    let mut store = nothing_saved();
    store
        .expect_store()
        .withf(|c| c.cookies.get("npsso").map(String::as_str) == Some("fresh"))
        .times(2)
        .returning(|_| Ok(()));

    let (mut plugin, _) = plugin(transport, store, launcher(r#"{"npsso": "fresh"}"#));

    assert!(matches!(plugin.authenticate(None).await.unwrap(), AuthOutcome::NextStep(_)));
    let auth = plugin.pass_login_credentials().await.unwrap();

    assert_eq!(auth.user_name, "paint_drying_fan");
}

#[tokio::test]
async fn empty_login_token_is_invalid_credentials() {
    let (mut plugin, _) = plugin(MockTransport::new(), nothing_saved(), launcher("not json"));

    plugin.authenticate(None).await.unwrap();
    let err = plugin.pass_login_credentials().await.unwrap_err();

    assert!(matches!(err, PsnError::InvalidCredentials));
}

#[tokio::test]
async fn credentials_without_login_are_invalid() {
    let (mut plugin, _) = plugin(MockTransport::new(), MockStore::new(), launcher(""));

    assert!(matches!(plugin.pass_login_credentials().await, Err(PsnError::InvalidCredentials)));
}

#[tokio::test]
async fn refreshed_cookies_are_persisted() {
    let mut transport = MockTransport::new();
    transport.expect_refresh_cookies().returning(|_| Ok(()));
    expect_query(&mut transport, "getProfileOracle", fixture("profile.json"));

    let mut store = MockStore::new();
    let mut seq = Sequence::new();
    store
        .expect_store()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|c| c.cookies.len() == 1)
        .returning(|_| Ok(()));
    store
        .expect_store()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|c| c.cookies.get("pdccws_p").map(String::as_str) == Some("session"))
        .returning(|_| Ok(()));

    let (mut plugin, cookies) = plugin(transport, store, launcher(""));
    let stored = StoredCredentials::from_cookies(Cookies::from([("npsso".to_string(), "stored".to_string())]));
    plugin.authenticate(Some(stored)).await.unwrap();

    // what the transport does when the backend sets a cookie
    cookies.update([("pdccws_p".to_string(), "session".to_string())]);
}

#[tokio::test]
async fn saved_session_resumes_without_host_credentials() {
    let mut transport = MockTransport::new();
    transport.expect_refresh_cookies().times(1).returning(|_| Ok(()));
    expect_query(&mut transport, "getProfileOracle", fixture("profile.json"));

    let mut store = MockStore::new();
    store.expect_load().times(1).returning(|| {
        Ok(Some(StoredCredentials::from_cookies(Cookies::from([("npsso".to_string(), "saved".to_string())]))))
    });
    store.expect_store().returning(|_| Ok(()));

    let (mut plugin, cookies) = plugin(transport, store, launcher(""));

    let outcome = plugin.authenticate(None).await.unwrap();

    assert!(matches!(outcome, AuthOutcome::Authenticated(ref auth) if auth.user_name == "paint_drying_fan"));
    assert_eq!(cookies.snapshot().get("npsso").map(String::as_str), Some("saved"));
}

#[tokio::test]
async fn stale_saved_session_starts_login() {
    let mut transport = MockTransport::new();
    transport.expect_refresh_cookies().returning(|_| Err(PsnError::InvalidCredentials));

    let mut store = MockStore::new();
    store.expect_load().returning(|| {
        Ok(Some(StoredCredentials::from_cookies(Cookies::from([("npsso".to_string(), "stale".to_string())]))))
    });
    store.expect_store().returning(|_| Ok(()));

    let (mut plugin, cookies) = plugin(transport, store, launcher(""));

    assert_eq!(plugin.authenticate(None).await.unwrap(), AuthOutcome::NextStep(WebSession::default()));
    assert!(cookies.snapshot().is_empty());
}

#[tokio::test]
async fn unreadable_saved_credentials_start_login() {
    let mut store = MockStore::new();
    store.expect_load().returning(|| {
        Err(CredentialError::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")))
    });

    let (mut plugin, _) = plugin(MockTransport::new(), store, launcher(""));

    assert_eq!(plugin.authenticate(None).await.unwrap(), AuthOutcome::NextStep(WebSession::default()));
}

#[tokio::test]
async fn saved_session_failure_other_than_credentials_is_reported() {
    let mut transport = MockTransport::new();
    transport
        .expect_refresh_cookies()
        .returning(|url| Err(PsnError::Backend { status: 503, url: url.to_string() }));

    let mut store = MockStore::new();
    store.expect_load().returning(|| {
        Ok(Some(StoredCredentials::from_cookies(Cookies::from([("npsso".to_string(), "saved".to_string())]))))
    });
    store.expect_store().returning(|_| Ok(()));

    let (mut plugin, _) = plugin(transport, store, launcher(""));

    assert!(matches!(plugin.authenticate(None).await, Err(PsnError::Backend { status: 503, .. })));
}
