//! Arcade configuration loaded from TOML.

use std::path::Path;
use std::time::Duration;

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use halloween_match3::STARTING_LIVES;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Deployment settings for the arcade.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct ArcadeConfig {
    /// Path of the sqlite database file.
    #[serde(default = "default_db_path")]
    db_path: String,

    /// Profile used when no player is named on the command line.
    #[serde(default = "default_player")]
    player: String,

    /// Lives granted to a newly created player.
    #[serde(default = "default_starting_lives")]
    starting_lives: u32,

    /// Delay between cascade passes, in milliseconds.
    #[serde(default = "default_pacing_ms")]
    pacing_ms: u64,

    /// Fixed seed for boards and surprise-box draws.
    #[serde(default)]
    seed: Option<u64>,
}

#[instrument]
fn default_db_path() -> String {
    "halloween_arcade.db".to_string()
}

#[instrument]
fn default_player() -> String {
    "player".to_string()
}

#[instrument]
fn default_starting_lives() -> u32 {
    STARTING_LIVES
}

#[instrument]
fn default_pacing_ms() -> u64 {
    250
}

impl Default for ArcadeConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            player: default_player(),
            starting_lives: default_starting_lives(),
            pacing_ms: default_pacing_ms(),
            seed: None,
        }
    }
}

impl ArcadeConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(db_path = %config.db_path, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            debug!("Config file absent, using defaults");
            Ok(Self::default())
        }
    }

    /// Serializes the configuration as TOML.
    #[instrument(skip(self))]
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::new(format!("Failed to serialize config: {}", e)))
    }

    /// Cascade pacing as a duration.
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
