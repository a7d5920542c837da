//! Configuration loading and management
//!
//! Handles parsing of `teamtodo.toml` from the data directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// File name of the configuration inside the data directory
pub const CONFIG_FILE: &str = "teamtodo.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Sync configuration
    #[serde(default)]
    pub sync: SyncConfig,

    /// Query defaults
    #[serde(default)]
    pub query: QueryConfig,

    /// Notification configuration
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Storage-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// How long a writer waits for the collection lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    crate::lock::DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// Live refresh configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Periodic re-fetch interval while a team is active
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Quiet period used to coalesce bursts of change notifications
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_refresh_interval_secs() -> u64 {
    5
}

fn default_debounce_ms() -> u64 {
    200
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Query layer defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Horizon for `upcoming`, inclusive
    #[serde(default = "default_upcoming_days")]
    pub upcoming_days: u32,

    /// Tasks per page in list output
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_upcoming_days() -> u32 {
    3
}

fn default_page_size() -> usize {
    10
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            upcoming_days: default_upcoming_days(),
            page_size: default_page_size(),
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Icon attached to every platform notification
    #[serde(default = "default_icon")]
    pub icon: String,
}

fn default_icon() -> String {
    "teamtodo.svg".to_string()
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            icon: default_icon(),
        }
    }
}

impl Config {
    /// Load configuration from a `teamtodo.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a data directory, or return defaults
    pub fn load_from_dir(data_dir: &Path) -> Self {
        let config_path = data_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.storage.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "storage.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.sync.refresh_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "sync.refresh_interval_secs must be > 0".to_string(),
            ));
        }
        if self.sync.debounce_ms > 10_000 {
            return Err(Error::InvalidConfig(
                "sync.debounce_ms must be <= 10000".to_string(),
            ));
        }
        if self.query.page_size == 0 {
            return Err(Error::InvalidConfig(
                "query.page_size must be > 0".to_string(),
            ));
        }
        if self.query.upcoming_days > 366 {
            return Err(Error::InvalidConfig(
                "query.upcoming_days must be <= 366".to_string(),
            ));
        }
        if self.notifications.icon.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "notifications.icon cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve the data directory ("browser profile").
///
/// Resolution order:
/// 1) explicit `--data-dir`
/// 2) `TEAMTODO_DATA_DIR`
/// 3) the platform data directory
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }

    if let Ok(env_dir) = std::env::var("TEAMTODO_DATA_DIR") {
        let trimmed = env_dir.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    directories::ProjectDirs::from("dev", "teamtodo", "teamtodo")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::DataDirUnavailable("unable to determine a home directory".to_string())
        })
}
