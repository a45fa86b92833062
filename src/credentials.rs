use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::Cookies;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Couldn't access stored credentials: {0}")]
    Io(#[from] std::io::Error),
    #[error("Stored credentials are corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CredentialError>;

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct StoredCredentials {
    pub cookies: Cookies,
}

impl StoredCredentials {
    pub fn from_cookies(cookies: Cookies) -> StoredCredentials {
        StoredCredentials { cookies }
    }
}

pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredCredentials>>;
    fn store(&self, credentials: &StoredCredentials) -> Result<()>;
}

/// Keeps credentials as a json file, e.g. `{"cookies": {"npsso": "..."}}`
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: &Path) -> FileCredentialStore {
        FileCredentialStore { path: path.to_path_buf() }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<StoredCredentials>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Replaces the file in one step, so a reader never sees a half written file.
    fn store(&self, credentials: &StoredCredentials) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        fs::write(&staging, serde_json::to_string_pretty(credentials)?)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}
