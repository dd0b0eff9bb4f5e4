//! Client configuration.
//!
//! Loaded from a TOML file or from `EVENTS_*` environment variables. Every
//! field has a default, so an empty file or environment is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ClientError;
use crate::session::SessionStore;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// `session_file` value that selects the per-user location under the config directory.
pub const DEFAULT_SESSION_FILE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    /// Sent with `POST /users` only.
    pub app_secret: Option<String>,
    pub timeout_secs: u64,
    /// Where the session is persisted; in-memory when unset. See `session_path`.
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            app_secret: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            session_file: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_app_secret(mut self, secret: impl Into<String>) -> Self {
        self.app_secret = Some(secret.into());
        self
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    pub fn load(path: &Path) -> Result<Self, ClientError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ClientError> {
        toml::from_str(contents).map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Read `EVENTS_API_URL`, `EVENTS_APP_SECRET`, `EVENTS_TIMEOUT_SECS` and
    /// `EVENTS_SESSION_FILE`; unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup("EVENTS_API_URL") {
            config.base_url = url;
        }
        config.app_secret = lookup("EVENTS_APP_SECRET").filter(|s| !s.is_empty());
        if let Some(raw) = lookup("EVENTS_TIMEOUT_SECS") {
            match raw.parse() {
                Ok(secs) => config.timeout_secs = secs,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid EVENTS_TIMEOUT_SECS"),
            }
        }
        config.session_file = lookup("EVENTS_SESSION_FILE").map(PathBuf::from);
        config
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The file backing the session store, if any. `"default"` resolves to
    /// `SessionStore::default_path()`, falling back to memory when the
    /// platform has no config directory.
    pub fn session_path(&self) -> Option<PathBuf> {
        match &self.session_file {
            Some(path) if path.as_os_str() == DEFAULT_SESSION_FILE => {
                let resolved = SessionStore::default_path();
                if resolved.is_none() {
                    tracing::warn!("no config directory; keeping the session in memory");
                }
                resolved
            }
            other => other.clone(),
        }
    }
}
