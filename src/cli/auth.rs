use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use super::{build_plugin, load_config, print_json, sign_in, Result};
use crate::login::console::ConsoleSurface;
use crate::login::SurfaceLauncher;
use crate::plugin::{AuthOutcome, Plugin};

#[derive(Debug, Parser)]
pub struct RunLogin {
    #[arg(short, long)]
    config_file: Option<PathBuf>,
}

impl RunLogin {
    /// Sign in through the terminal and keep the resulting session for later commands
    pub(super) async fn run(&self) -> Result<()> {
        let conf = load_config(self.config_file.as_deref())?;
        let finish_url = conf.login().finish_url;
        let mut plugin = build_plugin(&conf, SurfaceLauncher(move || ConsoleSurface::stdio(&finish_url)))?;

        if let AuthOutcome::Authenticated(auth) = plugin.authenticate(None).await? {
            return print_json(&auth);
        }

        let auth = plugin.pass_login_credentials().await?;
        info!("Signed in as {}", auth.user_name);
        print_json(&auth)
    }
}

#[derive(Debug, Parser)]
pub struct RunWhoami {
    #[arg(short, long)]
    config_file: Option<PathBuf>,
}

impl RunWhoami {
    pub(super) async fn run(&self) -> Result<()> {
        let conf = load_config(self.config_file.as_deref())?;
        let finish_url = conf.login().finish_url;
        let mut plugin = build_plugin(&conf, SurfaceLauncher(move || ConsoleSurface::stdio(&finish_url)))?;

        print_json(&sign_in(&conf, &mut plugin).await?)
    }
}
