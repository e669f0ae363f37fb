//! Store connection configuration.
//!
//! Credentials come from the environment (`REDOUBT_REDIS_URL` /
//! `REDOUBT_REDIS_TOKEN`); an optional `~/.redoubt/config.toml` supplies
//! defaults for anything the environment leaves unset. Environment wins.
//!
//! ```toml
//! [store]
//! url = "https://example-redis.upstash.io"
//! token = "..."
//! timeout_seconds = 10
//! max_retries = 2
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming the REST endpoint.
pub const ENV_URL: &str = "REDOUBT_REDIS_URL";

/// Environment variable holding the bearer token.
pub const ENV_TOKEN: &str = "REDOUBT_REDIS_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("store URL not configured: set {ENV_URL} or add [store].url to the config file")]
    MissingUrl,

    #[error("store token not configured: set {ENV_TOKEN} or add [store].token to the config file")]
    MissingToken,

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    store: FileStoreSection,
}

#[derive(Debug, Default, Deserialize)]
struct FileStoreSection {
    url: Option<String>,
    token: Option<String>,
    timeout_seconds: Option<u64>,
    max_retries: Option<u32>,
}

/// Resolved connection settings for the REST store.
#[derive(Clone)]
pub struct StoreConfig {
    url: String,
    token: String,
    timeout_seconds: Option<u64>,
    max_retries: Option<u32>,
}

impl StoreConfig {
    /// Default whole-request timeout.
    pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

    /// Default transport retry budget.
    pub const DEFAULT_MAX_RETRIES: u32 = 2;

    #[must_use]
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            timeout_seconds: None,
            max_retries: None,
        }
    }

    #[must_use]
    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Resolve from the environment plus the default config file location.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match config_path() {
            Some(path) if path.exists() => load_file(&path)?,
            _ => ConfigFile::default(),
        };
        Self::from_sources(
            std::env::var(ENV_URL).ok(),
            std::env::var(ENV_TOKEN).ok(),
            file.store,
        )
    }

    fn from_sources(
        env_url: Option<String>,
        env_token: Option<String>,
        file: FileStoreSection,
    ) -> Result<Self, ConfigError> {
        let url = env_url
            .filter(|v| !v.trim().is_empty())
            .or(file.url)
            .ok_or(ConfigError::MissingUrl)?;
        let token = env_token
            .filter(|v| !v.trim().is_empty())
            .or(file.token)
            .ok_or(ConfigError::MissingToken)?;
        Ok(Self {
            url,
            token,
            timeout_seconds: file.timeout_seconds,
            max_retries: file.max_retries,
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(Self::DEFAULT_TIMEOUT_SECONDS)
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(Self::DEFAULT_MAX_RETRIES)
    }
}

// The token is a credential; keep it out of logs and error chains.
impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("token", &"[redacted]")
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Default config file location (`~/.redoubt/config.toml`).
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".redoubt").join("config.toml"))
}

fn load_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
