#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::credentials::{CredentialStore, StoredCredentials};
use crate::http::{CookieJar, Cookies};
use crate::login::{LoginLauncher, LoginSettings, PendingLogin, WebSession};
use crate::models::game::{Authentication, Game, GameRecord, GameTime, PlayedGame, Subscription, SubscriptionGame};
use crate::psn::timestamp::parse_timestamp;
use crate::psn::{HttpTransport, MalformedResponse, PsnClient, PsnError, Result};

pub const PLUS_SUBSCRIPTION: &str = "PlayStation PLUS";

/// Played games by title id, prepared once per batch of game time queries.
pub type GameTimeContext = HashMap<String, PlayedGame>;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthOutcome {
    Authenticated(Authentication),
    /// The host should show its web session window while our login surface runs
    NextStep(WebSession),
}

/// What the host can ask of us.
#[async_trait]
pub trait Plugin: Send {
    async fn authenticate(&mut self, stored: Option<StoredCredentials>) -> Result<AuthOutcome>;
    async fn pass_login_credentials(&mut self) -> Result<Authentication>;
    async fn get_subscriptions(&self) -> Result<Vec<Subscription>>;
    async fn get_subscription_games(&self, subscription_name: &str) -> Result<Vec<SubscriptionGame>>;
    async fn prepare_game_times_context(&self, game_ids: &[String]) -> Result<GameTimeContext>;
    async fn get_game_time(&self, game_id: &str, context: &GameTimeContext) -> Result<GameTime>;
    async fn get_owned_games(&self) -> Result<Vec<Game>>;
    async fn shutdown(&mut self);
}

/// Merge played and purchased titles into one entry per title id. Purchased entries are laid
/// over played ones, so their names win.
pub fn merge_owned_games(played: Vec<GameRecord>, purchased: Vec<GameRecord>) -> Vec<Game> {
    let mut by_id: HashMap<String, GameRecord> = HashMap::new();

    for game in played.into_iter().chain(purchased) {
        by_id.insert(game.title_id.clone(), game);
    }

    by_id.into_values().map(Game::from).collect()
}

fn store_cookies<C: CredentialStore + ?Sized>(credentials: &C, cookies: &Cookies) {
    if let Err(e) = credentials.store(&StoredCredentials::from_cookies(cookies.clone())) {
        warn!("Failed to store credentials: {}", e);
    }
}

pub struct PsnPlugin<T, C, L> {
    client: PsnClient<T>,
    cookies: Arc<CookieJar>,
    credentials: Arc<C>,
    launcher: L,
    login: LoginSettings,
    pending_login: Option<PendingLogin>,
    persisting_cookies: bool,
}

impl<T, C, L> PsnPlugin<T, C, L>
where
    T: HttpTransport,
    C: CredentialStore + 'static,
    L: LoginLauncher,
{
    /// `cookies` must be the jar `client`'s transport reads and writes.
    pub fn new(
        client: PsnClient<T>,
        cookies: Arc<CookieJar>,
        credentials: Arc<C>,
        launcher: L,
        login: LoginSettings,
    ) -> PsnPlugin<T, C, L> {
        PsnPlugin {
            client,
            cookies,
            credentials,
            launcher,
            login,
            pending_login: None,
            persisting_cookies: false,
        }
    }

    async fn do_auth(&mut self, cookies: Cookies) -> Result<Authentication> {
        if cookies.is_empty() {
            return Err(PsnError::InvalidCredentials);
        }

        if !self.persisting_cookies {
            let credentials = self.credentials.clone();
            self.cookies.subscribe(move |updated| store_cookies(credentials.as_ref(), updated));
            self.persisting_cookies = true;
        }
        self.cookies.update(cookies);
        self.client.refresh_cookies().await?;

        let user = self.client.get_own_user_info().await?;
        if user.account_id.is_empty() {
            return Err(PsnError::InvalidCredentials);
        }

        info!(user = %user.online_id, "Authenticated with PSN");
        Ok(Authentication { user_id: user.account_id, user_name: user.online_id })
    }

    fn saved_cookies(&self) -> Option<Cookies> {
        match self.credentials.load() {
            Ok(saved) => saved.map(|s| s.cookies).filter(|c| !c.is_empty()),
            Err(e) => {
                warn!("Ignoring saved credentials: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl<T, C, L> Plugin for PsnPlugin<T, C, L>
where
    T: HttpTransport,
    C: CredentialStore + 'static,
    L: LoginLauncher,
{
    /// Credentials from the host come first. Without them we resume the session we saved
    /// ourselves; if that session has gone stale the user is sent through a fresh login.
    async fn authenticate(&mut self, stored: Option<StoredCredentials>) -> Result<AuthOutcome> {
        if let Some(cookies) = stored.map(|s| s.cookies).filter(|c| !c.is_empty()) {
            return Ok(AuthOutcome::Authenticated(self.do_auth(cookies).await?));
        }

        if let Some(cookies) = self.saved_cookies() {
            match self.do_auth(cookies).await {
                Ok(auth) => return Ok(AuthOutcome::Authenticated(auth)),
                Err(PsnError::InvalidCredentials) => {
                    info!("Saved session is no longer valid");
                    self.cookies.clear();
                }
                Err(e) => return Err(e),
            }
        }

        debug!("No usable cookies; starting login flow");
        self.pending_login = Some(self.launcher.launch(&self.login.login_url, &self.login.finish_url)?);
        Ok(AuthOutcome::NextStep(self.login.web_session.clone()))
    }

    async fn pass_login_credentials(&mut self) -> Result<Authentication> {
        let pending = self.pending_login.take().ok_or(PsnError::InvalidCredentials)?;
        let token = pending.token().await;
        if token.is_empty() {
            return Err(PsnError::InvalidCredentials);
        }

        let cookies = Cookies::from([("npsso".to_string(), token)]);
        store_cookies(self.credentials.as_ref(), &cookies);
        self.do_auth(cookies).await
    }

    async fn get_subscriptions(&self) -> Result<Vec<Subscription>> {
        let owned = self.client.get_subscription_status().await?;

        Ok(vec![Subscription { subscription_name: PLUS_SUBSCRIPTION.to_string(), end_time: None, owned }])
    }

    async fn get_subscription_games(&self, subscription_name: &str) -> Result<Vec<SubscriptionGame>> {
        if subscription_name != PLUS_SUBSCRIPTION {
            debug!("No games for unknown subscription {:?}", subscription_name);
            return Ok(vec![]);
        }

        self.client.get_subscription_games().await
    }

    async fn prepare_game_times_context(&self, _game_ids: &[String]) -> Result<GameTimeContext> {
        Ok(
            self.client
                .get_played_games()
                .await?
                .into_iter()
                .map(|game| (game.title_id.clone(), game))
                .collect()
        )
    }

    async fn get_game_time(&self, game_id: &str, context: &GameTimeContext) -> Result<GameTime> {
        let last_played_time = match context.get(game_id) {
            Some(game) => Some(parse_timestamp(&game.last_played_date_time).map_err(MalformedResponse::from)?),
            None => {
                debug!("No play history for {}", game_id);
                None
            }
        };

        Ok(GameTime { game_id: game_id.to_string(), time_played: None, last_played_time })
    }

    async fn get_owned_games(&self) -> Result<Vec<Game>> {
        let (purchased, played) = tokio::try_join!(
            self.client.get_purchased_games(),
            self.client.get_played_games(),
        )?;

        Ok(merge_owned_games(played.into_iter().map(GameRecord::from).collect(), purchased))
    }

    async fn shutdown(&mut self) {
        info!("Shutting down");
        self.pending_login = None;
        self.cookies.clear();
    }
}
