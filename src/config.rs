//! Application configuration.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::games::tictactoe::Mark;

/// Runtime configuration, loadable from a TOML file.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite stat database.
    #[serde(default = "default_db_path")]
    db_path: String,

    /// Probability that the machine opponent plays a random cell instead
    /// of the minimax move.
    #[serde(default = "default_blunder_probability")]
    blunder_probability: f64,

    /// Delay before the machine opponent replies, in milliseconds.
    #[serde(default = "default_machine_delay_ms")]
    machine_delay_ms: u64,

    /// Mark that opens every game.
    #[serde(default = "default_starting_mark")]
    starting_mark: Mark,
}

fn default_db_path() -> String {
    "triline.db".to_string()
}

fn default_blunder_probability() -> f64 {
    0.3
}

fn default_machine_delay_ms() -> u64 {
    600
}

fn default_starting_mark() -> Mark {
    Mark::X
}

impl AppConfig {
    /// Creates a configuration with explicit values.
    #[instrument(skip(db_path))]
    pub fn new(
        db_path: String,
        blunder_probability: f64,
        machine_delay_ms: u64,
        starting_mark: Mark,
    ) -> Self {
        Self {
            db_path,
            blunder_probability,
            machine_delay_ms,
            starting_mark,
        }
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        info!(db_path = %config.db_path, "Config loaded successfully");
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the blunder probability falls outside
    /// `[0.0, 1.0]`.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.blunder_probability) {
            return Err(ConfigError::new(format!(
                "blunder_probability must be within [0.0, 1.0], got {}",
                self.blunder_probability
            )));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            blunder_probability: default_blunder_probability(),
            machine_delay_ms: default_machine_delay_ms(),
            starting_mark: default_starting_mark(),
        }
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
