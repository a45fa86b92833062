use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use home::home_dir;
use serde::Deserialize;
use serde_inline_default::serde_inline_default;
use thiserror::Error;
use toml;

use crate::login::{LoginSettings, LOGIN_FINISH_URL, LOGIN_URL};
use crate::psn::endpoints::{Endpoints, DEFAULT_LIMIT, GRAPHQL_URL, REFRESH_URL, SUBSCRIPTIONS_URL};

const CONFIG_DIR: &str = ".psn-library";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine home dir")]
    NoHome,
    #[error("Failed to read config file {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Deserialize, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub psn: Psn,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub storage: Storage,
}

#[serde_inline_default]
#[derive(Deserialize, Debug)]
pub struct Psn {
    #[serde_inline_default(GRAPHQL_URL.to_string())]
    pub graphql_url: String,
    #[serde_inline_default(SUBSCRIPTIONS_URL.to_string())]
    pub store_url: String,
    #[serde_inline_default(DEFAULT_LIMIT)]
    pub page_size: u32,
    #[serde_inline_default(DEFAULT_LIMIT)]
    pub played_limit: u32,
}

impl Default for Psn {
    fn default() -> Self {
        Psn {
            graphql_url: GRAPHQL_URL.to_string(),
            store_url: SUBSCRIPTIONS_URL.to_string(),
            page_size: DEFAULT_LIMIT,
            played_limit: DEFAULT_LIMIT,
        }
    }
}

#[serde_inline_default]
#[derive(Deserialize, Debug)]
pub struct Auth {
    #[serde_inline_default(LOGIN_URL.to_string())]
    pub login_url: String,
    #[serde_inline_default(LOGIN_FINISH_URL.to_string())]
    pub finish_url: String,
    #[serde_inline_default(REFRESH_URL.to_string())]
    pub refresh_url: String,
}

impl Default for Auth {
    fn default() -> Self {
        Auth {
            login_url: LOGIN_URL.to_string(),
            finish_url: LOGIN_FINISH_URL.to_string(),
            refresh_url: REFRESH_URL.to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct Storage {
    /// Defaults to credentials.json next to the config file
    pub credentials_file: Option<PathBuf>,
}

impl Config {
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            graphql_url: self.psn.graphql_url.clone(),
            store_url: self.psn.store_url.clone(),
            refresh_url: self.auth.refresh_url.clone(),
            page_size: self.psn.page_size,
            played_limit: self.psn.played_limit,
        }
    }

    pub fn login(&self) -> LoginSettings {
        LoginSettings {
            login_url: self.auth.login_url.clone(),
            finish_url: self.auth.finish_url.clone(),
            ..LoginSettings::default()
        }
    }

    pub fn credentials_file(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.credentials_file {
            Some(path) => Ok(path.clone()),
            None => Ok(config_dir()?.join("credentials.json")),
        }
    }
}

fn config_dir() -> Result<PathBuf, ConfigError> {
    let mut dir = home_dir().ok_or(ConfigError::NoHome)?;
    dir.push(CONFIG_DIR);
    Ok(dir)
}

pub fn parse(raw: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(raw)?)
}

/// Read the given config file, or `~/.psn-library/config.toml`. Only the default file may be
/// absent, in which case every setting takes its default.
pub fn read(path: Option<&Path>) -> Result<Config, ConfigError> {
    let (f, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (config_dir()?.join("config.toml"), false),
    };

    match std::fs::read_to_string(&f) {
        Ok(raw) => parse(&raw),
        Err(e) if e.kind() == ErrorKind::NotFound && !required => Ok(Config::default()),
        Err(source) => Err(ConfigError::Io { path: f, source }),
    }
}
