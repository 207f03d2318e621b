//! Configuration management for the raffle engine.
//!
//! Provides structured configuration with validation.
//!
//! # Configuration Sources
//!
//! Configuration can be loaded from:
//! - Environment variables (prefixed with `RAFFLE_`)
//! - JSON configuration files
//! - Programmatic defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use raffle_core::config::EngineConfig;
//!
//! let config = EngineConfig::builder()
//!     .entrance_fee(1_000)
//!     .interval_secs(30)
//!     .build()?;
//! ```

use crate::types::{Amount, DEFAULT_MAX_PARTICIPANTS};
use crate::{RaffleError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Immutable parameters of a raffle: entrance fee and round interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaffleConfig {
    /// Minimum amount accepted by `enter`.
    pub entrance_fee: Amount,

    /// Minimum round length in seconds before upkeep may close it.
    pub interval_secs: u64,
}

impl RaffleConfig {
    /// Create with validation.
    pub fn new(entrance_fee: Amount, interval_secs: u64) -> Result<Self> {
        let config = Self {
            entrance_fee,
            interval_secs,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.entrance_fee == 0 {
            return Err(RaffleError::InvalidConfig(
                "entrance_fee must be greater than 0".into(),
            ));
        }
        if self.interval_secs == 0 {
            return Err(RaffleError::InvalidConfig(
                "interval_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for RaffleConfig {
    fn default() -> Self {
        Self {
            entrance_fee: 10_000_000,
            interval_secs: 30,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// JSON output format.
    pub json_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json_output: false,
        }
    }
}

/// Complete engine configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub raffle: RaffleConfig,

    /// Maximum entries accepted in a single round.
    pub max_participants: usize,

    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            raffle: RaffleConfig::default(),
            max_participants: DEFAULT_MAX_PARTICIPANTS,
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Looks for variables prefixed with `RAFFLE_`:
    /// - `RAFFLE_ENTRANCE_FEE` - Entrance fee in the smallest unit
    /// - `RAFFLE_INTERVAL_SECS` - Round interval in seconds
    /// - `RAFFLE_MAX_PARTICIPANTS` - Maximum entries per round
    /// - `RAFFLE_LOG_LEVEL` - Logging level (trace, debug, info, warn, error)
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file. Missing sections take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RaffleError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| RaffleError::InvalidConfig(format!("invalid config json: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(fee) = lookup("RAFFLE_ENTRANCE_FEE") {
            self.raffle.entrance_fee = fee.parse().map_err(|e| {
                RaffleError::InvalidConfig(format!("Invalid RAFFLE_ENTRANCE_FEE: {}", e))
            })?;
        }

        if let Some(interval) = lookup("RAFFLE_INTERVAL_SECS") {
            self.raffle.interval_secs = interval.parse().map_err(|e| {
                RaffleError::InvalidConfig(format!("Invalid RAFFLE_INTERVAL_SECS: {}", e))
            })?;
        }

        if let Some(max) = lookup("RAFFLE_MAX_PARTICIPANTS") {
            self.max_participants = max.parse().map_err(|e| {
                RaffleError::InvalidConfig(format!("Invalid RAFFLE_MAX_PARTICIPANTS: {}", e))
            })?;
        }

        if let Some(level) = lookup("RAFFLE_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        self.raffle.validate()?;

        if self.max_participants == 0 {
            return Err(RaffleError::InvalidConfig(
                "max_participants must be greater than 0".into(),
            ));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(RaffleError::InvalidConfig(format!(
                    "unknown log level {:?}",
                    other
                )))
            }
        }

        Ok(())
    }
}

/// Builder for EngineConfig.
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn entrance_fee(mut self, fee: Amount) -> Self {
        self.config.raffle.entrance_fee = fee;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.raffle.interval_secs = interval.as_secs();
        self
    }

    pub fn interval_secs(mut self, secs: u64) -> Self {
        self.config.raffle.interval_secs = secs;
        self
    }

    pub fn max_participants(mut self, max: usize) -> Self {
        self.config.max_participants = max;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn json_logs(mut self, enabled: bool) -> Self {
        self.config.logging.json_output = enabled;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
