use std::path::PathBuf;

use clap::Parser;
use futures::future::try_join_all;

use super::{build_plugin, load_config, print_json, sign_in, Result};
use crate::login::console::ConsoleSurface;
use crate::login::SurfaceLauncher;
use crate::plugin::{Plugin, PLUS_SUBSCRIPTION};

macro_rules! signed_in_plugin {
    ($conf:expr) => {{
        let finish_url = $conf.login().finish_url;
        let mut plugin = build_plugin(&$conf, SurfaceLauncher(move || ConsoleSurface::stdio(&finish_url)))?;
        sign_in(&$conf, &mut plugin).await?;
        plugin
    }};
}

#[derive(Debug, Parser)]
pub struct RunOwned {
    #[arg(short, long)]
    config_file: Option<PathBuf>,
}

impl RunOwned {
    /// Everything in the library: purchases plus anything with play history
    pub(super) async fn run(&self) -> Result<()> {
        let conf = load_config(self.config_file.as_deref())?;
        let plugin = signed_in_plugin!(conf);

        let mut games = plugin.get_owned_games().await?;
        games.sort_by(|a, b| a.game_title.cmp(&b.game_title));
        print_json(&games)
    }
}

#[derive(Debug, Parser)]
pub struct RunPlayed {
    #[arg(short, long)]
    config_file: Option<PathBuf>,
    #[arg(
      short, long, num_args = 1.., value_delimiter = ',',
      help = "Title IDs to look up (comma-separated); defaults to everything played recently"
    )]
    games: Vec<String>,
}

impl RunPlayed {
    pub(super) async fn run(&self) -> Result<()> {
        let conf = load_config(self.config_file.as_deref())?;
        let plugin = signed_in_plugin!(conf);

        let context = plugin.prepare_game_times_context(&self.games).await?;
        let mut ids: Vec<String> = if self.games.is_empty() {
            context.keys().cloned().collect()
        } else {
            self.games.clone()
        };
        ids.sort();

        let times = try_join_all(ids.iter().map(|id| plugin.get_game_time(id, &context))).await?;
        print_json(&times)
    }
}

#[derive(Debug, Parser)]
pub struct RunSubscriptions {
    #[arg(short, long)]
    config_file: Option<PathBuf>,
}

impl RunSubscriptions {
    pub(super) async fn run(&self) -> Result<()> {
        let conf = load_config(self.config_file.as_deref())?;
        let plugin = signed_in_plugin!(conf);

        print_json(&plugin.get_subscriptions().await?)
    }
}

#[derive(Debug, Parser)]
pub struct RunSubscriptionGames {
    #[arg(short, long)]
    config_file: Option<PathBuf>,
    #[arg(short, long, default_value = PLUS_SUBSCRIPTION)]
    subscription: String,
}

impl RunSubscriptionGames {
    pub(super) async fn run(&self) -> Result<()> {
        let conf = load_config(self.config_file.as_deref())?;
        let plugin = signed_in_plugin!(conf);

        print_json(&plugin.get_subscription_games(&self.subscription).await?)
    }
}
