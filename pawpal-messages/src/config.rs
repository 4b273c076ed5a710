//! Configuration management for the PawPal messaging client.

use crate::constants::polling::POLL_INTERVAL_SECS;
use crate::constants::storage::LAST_CONVERSATION_MAX_AGE_DAYS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Application directory name under the platform config/data directories.
pub const APP_DIR: &str = "pawpal";

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "messages.toml";

/// Errors reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("no config directory available on this platform")]
    NoConfigDir,
}

/// Client configuration stored as TOML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Root of the REST API, e.g. `https://pawpal.example/api`
    pub api_base_url: String,
    /// Bearer token sent with every request
    pub auth_token: Option<String>,
    /// Id of the signed-in user
    pub user_id: Option<String>,
    /// Username of the signed-in user
    pub username: Option<String>,
    /// Seconds between background refreshes
    pub poll_interval_secs: u64,
    /// Age after which the last-opened-conversation record is ignored
    pub last_conversation_max_age_days: u64,
    /// Override for the directory holding persisted client state
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            auth_token: None,
            user_id: None,
            username: None,
            poll_interval_secs: POLL_INTERVAL_SECS,
            last_conversation_max_age_days: LAST_CONVERSATION_MAX_AGE_DAYS,
            data_dir: None,
        }
    }
}

impl Config {
    /// Default location of the configuration file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location, falling back to
    /// defaults if it is missing or invalid.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            tracing::warn!("No config directory available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::info!("No config file at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path.display());
                config
            }
            Err(err) => {
                tracing::error!(%err, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Save configuration to an explicit file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(io_err)?;
        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn last_conversation_max_age(&self) -> Duration {
        Duration::from_secs(self.last_conversation_max_age_days * 24 * 60 * 60)
    }

    /// Directory for persisted client state.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from(".local/share"))
                .join(APP_DIR)
        })
    }
}
