//! # Back Office Configuration
//!
//! Where the database lives, who the owner is, and how reports and logs
//! behave. Business settings (company identity, tax rate) are not here:
//! they belong to the owner and live in the store.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     COMPTOIR_DB_PATH=/srv/comptoir/comptoir.db                         │
//! │     COMPTOIR_USER_ID=uid-123                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $COMPTOIR_CONFIG, or                                               │
//! │     ~/.config/comptoir/comptoir.toml (Linux)                           │
//! │     ~/Library/Application Support/ma.comptoir.Comptoir/ (macOS)        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # comptoir.toml
//! [database]
//! path = "/srv/comptoir/comptoir.db"
//! max_connections = 5
//!
//! [owner]
//! user_id = "uid-123"
//! email = "gerant@atlas.ma"
//! approval_poll_ms = 15000
//!
//! [reports]
//! low_stock_threshold = 10
//! ranking_size = 5
//!
//! [logging]
//! filter = "info,comptoir=debug,sqlx=warn"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use comptoir_core::metrics::MetricsOptions;
use comptoir_core::{LOW_STOCK_THRESHOLD, RANKING_SIZE};

/// Name of the config file inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "comptoir.toml";

/// Default tracing filter when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info,comptoir=debug,sqlx=warn";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("No config path available")]
    NoPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// SQLite file. `None` resolves to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

/// The identity the back office signs in as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerSection {
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    /// How often a pending account checks whether it was approved.
    #[serde(default = "default_approval_poll_ms")]
    pub approval_poll_ms: u64,
}

fn default_approval_poll_ms() -> u64 {
    15_000
}

impl Default for OwnerSection {
    fn default() -> Self {
        OwnerSection {
            user_id: "local-owner".to_string(),
            email: String::new(),
            approval_poll_ms: default_approval_poll_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportsSection {
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,

    #[serde(default = "default_ranking_size")]
    pub ranking_size: usize,
}

fn default_low_stock_threshold() -> i64 {
    LOW_STOCK_THRESHOLD
}

fn default_ranking_size() -> usize {
    RANKING_SIZE
}

impl Default for ReportsSection {
    fn default() -> Self {
        ReportsSection {
            low_stock_threshold: default_low_stock_threshold(),
            ranking_size: default_ranking_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        LoggingSection {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// App Config
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub owner: OwnerSection,

    #[serde(default)]
    pub reports: ReportsSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`comptoir.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var_os("COMPTOIR_CONFIG").map(PathBuf::from))
            .or_else(Self::default_config_path);

        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.owner.user_id.trim().is_empty() {
            return Err(ConfigError::Invalid("owner.user_id must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.owner.approval_poll_ms == 0 {
            return Err(ConfigError::Invalid(
                "owner.approval_poll_ms must be greater than 0".into(),
            ));
        }
        if self.reports.low_stock_threshold < 0 {
            return Err(ConfigError::Invalid(
                "reports.low_stock_threshold must not be negative".into(),
            ));
        }
        if self.reports.ranking_size == 0 {
            return Err(ConfigError::Invalid(
                "reports.ranking_size must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Applies `COMPTOIR_*` overrides read through `var`.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("COMPTOIR_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(id) = var("COMPTOIR_USER_ID") {
            debug!(user_id = %id, "Overriding owner from environment");
            self.owner.user_id = id;
        }

        if let Some(email) = var("COMPTOIR_USER_EMAIL") {
            self.owner.email = email;
        }

        if let Some(filter) = var("COMPTOIR_LOG") {
            self.logging.filter = filter;
        }

        if let Some(threshold) = var("COMPTOIR_LOW_STOCK_THRESHOLD") {
            match threshold.parse::<i64>() {
                Ok(t) => self.reports.low_stock_threshold = t,
                Err(_) => warn!(value = %threshold, "Ignoring invalid COMPTOIR_LOW_STOCK_THRESHOLD"),
            }
        }

        if let Some(size) = var("COMPTOIR_RANKING_SIZE") {
            match size.parse::<usize>() {
                Ok(s) => self.reports.ranking_size = s,
                Err(_) => warn!(value = %size, "Ignoring invalid COMPTOIR_RANKING_SIZE"),
            }
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("ma", "comptoir", "Comptoir")
    }

    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Database file: configured path, else `comptoir.db` in the platform
    /// data directory (created if missing).
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = Self::project_dirs().ok_or(ConfigError::NoPath)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        Ok(data_dir.join("comptoir.db"))
    }

    pub fn approval_poll_interval(&self) -> Duration {
        Duration::from_millis(self.owner.approval_poll_ms)
    }

    pub fn metrics_options(&self) -> MetricsOptions {
        MetricsOptions {
            low_stock_threshold: self.reports.low_stock_threshold,
            ranking_size: self.reports.ranking_size,
        }
    }
}
