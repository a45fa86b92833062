mod auth;
mod library;
mod serve;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::config::{self, Config, ConfigError};
use crate::credentials::{CredentialError, CredentialStore, FileCredentialStore};
use crate::http::{CookieJar, UreqTransport};
use crate::login::LoginLauncher;
use crate::models::game::Authentication;
use crate::plugin::{AuthOutcome, Plugin, PsnPlugin};
use crate::psn::{PsnClient, PsnError};

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error(transparent)]
    Psn(#[from] PsnError),
    #[error("Could not write output: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not encode output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Not logged in; run `psn-library login` first")]
    NotLoggedIn,
}

type Result<T> = std::result::Result<T, CliError>;

type CliPlugin<L> = PsnPlugin<UreqTransport, FileCredentialStore, L>;

#[derive(Debug, Parser)]
#[command(name = "psn-library")]
#[command(version = "0.1.0")]
enum Cli {
    Login(auth::RunLogin),
    Whoami(auth::RunWhoami),
    Owned(library::RunOwned),
    Played(library::RunPlayed),
    Subscriptions(library::RunSubscriptions),
    SubscriptionGames(library::RunSubscriptionGames),
    Serve(serve::RunServe),
}

impl Cli {
    async fn run(&self) -> Result<()> {
        match self {
            Self::Login(cmd) => cmd.run().await,
            Self::Whoami(cmd) => cmd.run().await,
            Self::Owned(cmd) => cmd.run().await,
            Self::Played(cmd) => cmd.run().await,
            Self::Subscriptions(cmd) => cmd.run().await,
            Self::SubscriptionGames(cmd) => cmd.run().await,
            Self::Serve(cmd) => cmd.run().await,
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    Ok(config::read(path)?)
}

/// Wire the plugin to the real backend and a credentials file.
fn build_plugin<L: LoginLauncher>(conf: &Config, launcher: L) -> Result<CliPlugin<L>> {
    let cookies = Arc::new(CookieJar::new());
    let transport = UreqTransport::new(cookies.clone());
    let client = PsnClient::new(transport, conf.endpoints());
    let credentials = Arc::new(FileCredentialStore::new(&conf.credentials_file()?));

    Ok(PsnPlugin::new(client, cookies, credentials, launcher, conf.login()))
}

/// Sign in with the stored session; commands other than `login` never start a login flow.
async fn sign_in<L: LoginLauncher>(conf: &Config, plugin: &mut CliPlugin<L>) -> Result<Authentication> {
    let stored = FileCredentialStore::new(&conf.credentials_file()?)
        .load()?
        .filter(|stored| !stored.cookies.is_empty())
        .ok_or(CliError::NotLoggedIn)?;

    match plugin.authenticate(Some(stored)).await? {
        AuthOutcome::Authenticated(auth) => Ok(auth),
        AuthOutcome::NextStep(_) => Err(CliError::NotLoggedIn),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn cli_main() {
    if let Err(e) = Cli::parse().run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}
