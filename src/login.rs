
pub mod console;

use std::io;
use std::sync::mpsc;
use std::thread;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

pub const LOGIN_URL: &str = "https://web.np.playstation.com/api/session/v1/signin\
    ?redirect_uri=https://ca.account.sony.com/api/v1/ssocookie&smcid=web:pdc";
/// Where the host's own web view should stop
pub const LOGIN_REDIRECT_URL: &str = "https://www.playstation.com/";
/// Shows the npsso token once signed in
pub const LOGIN_FINISH_URL: &str = "https://ca.account.sony.com/api/v1/ssocookie";
pub const HOST_LOGIN_URL: &str = "https://my.account.sony.com/";

/// Parameters the host needs to open its own web view while our login surface is up.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct WebSession {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub start_uri: String,
    pub end_uri_regex: String,
    pub end_uri: String,
}

impl Default for WebSession {
    fn default() -> Self {
        WebSession {
            window_title: "FINISH AUTH PROCESS AT ANOTHER WINDOW AND CLICK NEXT".to_string(),
            window_width: 536,
            window_height: 200,
            start_uri: HOST_LOGIN_URL.to_string(),
            end_uri_regex: format!("^{}.*", LOGIN_REDIRECT_URL.replace('.', "\\.")),
            end_uri: LOGIN_REDIRECT_URL.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoginSettings {
    /// Where our own surface starts
    pub login_url: String,
    /// Reaching this page ends our surface's flow
    pub finish_url: String,
    pub web_session: WebSession,
}

impl Default for LoginSettings {
    fn default() -> Self {
        LoginSettings {
            login_url: LOGIN_URL.to_string(),
            finish_url: LOGIN_FINISH_URL.to_string(),
            web_session: WebSession::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginState {
    NotStarted,
    AwaitingRedirect,
    TokenExtracted,
    Closed,
}

/// Receives the rendered text of the current document, along with the surface it came from.
pub type TextVisitor = Box<dyn FnOnce(&mut dyn BrowserSurface, String) + Send>;

/// An embedded browser window, driven from the thread that created it.
pub trait BrowserSurface {
    fn navigate(&mut self, url: &str);
    fn current_url(&self) -> String;
    /// Text may be delivered later, from inside `run`.
    fn get_text(&mut self, visitor: TextVisitor);
    fn close(&mut self);
    /// Pump the surface's event loop until it is closed, reporting each finished page load.
    fn run(&mut self, handler: &mut dyn LoadHandler);
}

pub trait LoadHandler {
    fn on_load_end(&mut self, surface: &mut dyn BrowserSurface);
}

/// Drives a surface through the PSN sign-in pages and captures the npsso token shown once the
/// user reaches `target_url`. Blocks until the surface closes; if the user never gets there it
/// never returns.
pub struct LoginFlow {
    start_url: String,
    target_url: String,
    state: LoginState,
    text_tx: mpsc::Sender<String>,
    text_rx: mpsc::Receiver<String>,
}

impl LoginFlow {
    pub fn new(start_url: &str, target_url: &str) -> LoginFlow {
        let (text_tx, text_rx) = mpsc::channel();

        LoginFlow {
            start_url: start_url.to_string(),
            target_url: target_url.to_string(),
            state: LoginState::NotStarted,
            text_tx,
            text_rx,
        }
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    /// Returns the token, or an empty string if none could be read.
    pub fn run<S: BrowserSurface + ?Sized>(&mut self, surface: &mut S) -> String {
        surface.navigate(&self.start_url);
        self.state = LoginState::AwaitingRedirect;

        surface.run(self);
        self.state = LoginState::Closed;

        let text = self.text_rx.try_recv().unwrap_or_default();
        extract_token(&text)
    }
}

impl LoadHandler for LoginFlow {
    fn on_load_end(&mut self, surface: &mut dyn BrowserSurface) {
        if self.state != LoginState::AwaitingRedirect || surface.current_url() != self.target_url {
            return;
        }

        debug!("Login flow reached {}", self.target_url);
        self.state = LoginState::TokenExtracted;

        let text_tx = self.text_tx.clone();
        surface.get_text(Box::new(move |surface: &mut dyn BrowserSurface, text: String| {
            let _ = text_tx.send(text);
            surface.close();
        }));
    }
}

/// The finish page is a json object like `{"npsso": "..."}`
pub fn extract_token(text: &str) -> String {
    let token = serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|page| page.get("npsso")?.as_str().map(str::to_string));

    match token {
        Some(token) => token,
        None => {
            warn!("No npsso token on the login finish page");
            String::new()
        }
    }
}

/// A login running on its own thread. Resolves to an empty token if the flow failed.
pub struct PendingLogin(oneshot::Receiver<String>);

impl PendingLogin {
    pub async fn token(self) -> String {
        self.0.await.unwrap_or_default()
    }
}

/// Run a login flow on a dedicated thread. The surface is created on that thread, since UI
/// toolkits generally want to be driven from the thread that owns their window.
pub fn spawn_login<S, F>(make_surface: F, start_url: &str, target_url: &str) -> io::Result<PendingLogin>
where
    S: BrowserSurface,
    F: FnOnce() -> S + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let mut flow = LoginFlow::new(start_url, target_url);

    thread::Builder::new()
        .name("psn-login".to_string())
        .spawn(move || {
            let mut surface = make_surface();
            let token = flow.run(&mut surface);
            info!(success = !token.is_empty(), "Login flow finished");
            let _ = tx.send(token);
        })?;

    Ok(PendingLogin(rx))
}

/// Starts logins on behalf of the plugin.
pub trait LoginLauncher: Send + Sync {
    fn launch(&self, start_url: &str, target_url: &str) -> io::Result<PendingLogin>;
}

/// Launches logins on surfaces built by the wrapped factory.
pub struct SurfaceLauncher<F>(pub F);

impl<F, S> LoginLauncher for SurfaceLauncher<F>
where
    F: Fn() -> S + Clone + Send + Sync + 'static,
    S: BrowserSurface,
{
    fn launch(&self, start_url: &str, target_url: &str) -> io::Result<PendingLogin> {
        spawn_login(self.0.clone(), start_url, target_url)
    }
}
