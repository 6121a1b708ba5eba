// Local configuration for the workbench.
//
// Global config: `~/.rpcdesk/config.toml`
// Database:      `~/.rpcdesk/rpcdesk.db` unless overridden

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default quiet period before tab state is flushed.
const DEFAULT_QUIET_PERIOD_MS: u64 = 1000;
/// Minimum allowed quiet period.
const MIN_QUIET_PERIOD_MS: u64 = 100;
/// Maximum allowed quiet period.
const MAX_QUIET_PERIOD_MS: u64 = 10_000;
const DEFAULT_HISTORY_LIMIT: usize = 100;
const DEFAULT_BUSY_MINIMUM_MS: u64 = 300;

/// Root directory for rpcdesk state: `~/.rpcdesk/`.
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".rpcdesk"))
}

/// Path to the global config file: `~/.rpcdesk/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    data_dir().map(|d| d.join("config.toml"))
}

// ── Global config ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlobalConfig {
    /// Delay after the last tab mutation before tab state is written.
    pub quiet_period_ms: u64,
    /// Number of history records loaded into the history list.
    pub history_limit: usize,
    /// Database location override.
    pub database_path: Option<PathBuf>,
    /// Minimum time a per-tab loading flag stays visible.
    pub busy_minimum_ms: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: DEFAULT_QUIET_PERIOD_MS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            database_path: None,
            busy_minimum_ms: DEFAULT_BUSY_MINIMUM_MS,
        }
    }
}

impl GlobalConfig {
    /// Load from `~/.rpcdesk/config.toml`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load() -> Self {
        global_config_path().and_then(|p| Self::load_from(&p).ok()).unwrap_or_default()
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save to `~/.rpcdesk/config.toml`.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = global_config_path().ok_or_else(|| {
            ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine home directory",
            ))
        })?;
        self.save_to(&path)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    /// Quiet period, clamped to [100ms, 10s].
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms.clamp(MIN_QUIET_PERIOD_MS, MAX_QUIET_PERIOD_MS))
    }

    pub fn busy_minimum(&self) -> Duration {
        Duration::from_millis(self.busy_minimum_ms)
    }

    /// Database file, honoring `database_path`.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_path.clone().or_else(|| data_dir().map(|d| d.join("rpcdesk.db")))
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config I/O error: {e}"),
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Serialize(e) => write!(f, "config serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
