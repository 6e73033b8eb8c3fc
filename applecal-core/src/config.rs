//! Client configuration at ~/.config/applecal/config.toml
//!
//! Sources, lowest precedence first: built-in defaults, the optional config
//! file, then `APPLECAL_*` environment variables. The password is never part
//! of this structure.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::constants::{
    DEFAULT_BACKOFF_MS, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS, ICLOUD_WELL_KNOWN,
    default_user_agent,
};
use crate::error::{AppleCalError, CalResult};

const ENV_PREFIX: &str = "APPLECAL";

fn default_discovery_url() -> String {
    ICLOUD_WELL_KNOWN.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_backoff_ms() -> u64 {
    DEFAULT_BACKOFF_MS
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_discovery_url")]
    pub discovery_url: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt for idempotent requests.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base for exponential backoff between retries.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Apple ID used when none is given on the command line.
    pub apple_id: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            discovery_url: default_discovery_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            user_agent: default_user_agent(),
            apple_id: None,
        }
    }
}

impl ClientConfig {
    pub fn config_path() -> CalResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AppleCalError::Config("Could not determine config directory".into()))?
            .join("applecal");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default config path and the environment.
    pub fn load() -> CalResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from `path` (which may not exist) and the environment.
    pub fn load_from(path: &Path) -> CalResult<Self> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .map_err(|e| AppleCalError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| AppleCalError::Config(e.to_string()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}
