use std::path::PathBuf;

use clap::Parser;
use tokio::io::{stdin, stdout, BufReader};
use tracing::info;

use super::{build_plugin, load_config, Result};
use crate::host::HostSession;
use crate::login::console::ConsoleSurface;
use crate::login::SurfaceLauncher;

#[derive(Debug, Parser)]
pub struct RunServe {
    #[arg(short, long)]
    config_file: Option<PathBuf>,
}

impl RunServe {
    /// Answer a host over stdin/stdout until it shuts us down. Logins prompt on the terminal,
    /// since stdin belongs to the host.
    pub(super) async fn run(&self) -> Result<()> {
        let conf = load_config(self.config_file.as_deref())?;
        let finish_url = conf.login().finish_url;
        let plugin = build_plugin(&conf, SurfaceLauncher(move || ConsoleSurface::terminal(&finish_url)))?;

        info!("Serving host requests on stdio");
        let mut session = HostSession::new(plugin);
        session.serve(BufReader::new(stdin()), stdout()).await?;

        info!("Host session ended");
        Ok(())
    }
}
