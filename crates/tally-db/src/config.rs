//! # Ledger Configuration
//!
//! Loads database and posting settings.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     TALLY_DB_PATH=/var/lib/tally/tally.db                               │
//! │     TALLY_DB_MAX_CONNECTIONS=8                                          │
//! │     TALLY_VERIFY_TOTALS=false                                           │
//! │     TALLY_TOTALS_TOLERANCE_CENTS=2                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/tally/tally.toml (Linux)                                  │
//! │     ~/Library/Application Support/com.tally.tally/tally.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! │     ./tally.db, 5 connections, totals verified within 1 cent            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "./tally.db"
//! max_connections = 5
//! min_connections = 1
//! connect_timeout_secs = 30
//!
//! [ledger]
//! verify_totals = true
//! totals_tolerance_cents = 1
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tally_core::LedgerSettings;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::DbConfig;

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path. `:memory:` opens a private in-memory database.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Pool acquire timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./tally.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

// =============================================================================
// Tally Config
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TallyConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,
}

impl TallyConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`tally.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Invalid("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid(
                "database.min_connections must not exceed max_connections".into(),
            ));
        }

        if self.ledger.totals_tolerance_cents < 0 {
            return Err(ConfigError::Invalid(
                "ledger.totals_tolerance_cents must not be negative".into(),
            ));
        }

        Ok(())
    }

    /// Applies `TALLY_*` overrides read through `lookup`.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("TALLY_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("TALLY_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid TALLY_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(verify) = lookup("TALLY_VERIFY_TOTALS") {
            match verify.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.ledger.verify_totals = true,
                "0" | "false" | "no" | "off" => self.ledger.verify_totals = false,
                _ => warn!(value = %verify, "Ignoring invalid TALLY_VERIFY_TOTALS"),
            }
        }

        if let Some(tolerance) = lookup("TALLY_TOTALS_TOLERANCE_CENTS") {
            match tolerance.parse::<i64>() {
                Ok(n) => self.ledger.totals_tolerance_cents = n,
                Err(_) => warn!(value = %tolerance, "Ignoring invalid TALLY_TOTALS_TOLERANCE_CENTS"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "tally")
            .map(|dirs| dirs.config_dir().join("tally.toml"))
    }

    /// Builds the pool configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .connect_timeout(Duration::from_secs(self.database.connect_timeout_secs))
            .ledger(self.ledger)
    }
}
