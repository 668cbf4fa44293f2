//! Application configuration structures.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::distributor::DEFAULT_DISTRIBUTION_INTERVAL;
use crate::producer::{DEFAULT_MAX_INTERVAL, DEFAULT_MIN_INTERVAL};
use crate::scheduler::Schedule;
use crate::transmitter::TransmitterConfig;

use super::validation::{ConfigError, require_positive};

// =============================================================================
// Constants
// =============================================================================

/// Default spool directory, relative to the working directory.
pub const DEFAULT_SPOOL_DIR: &str = "spool";

// =============================================================================
// Spool Configuration
// =============================================================================

/// Spool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpoolConfig {
    /// Directory holding data files and lock markers (default: "spool").
    pub dir: PathBuf,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_SPOOL_DIR),
        }
    }
}

// =============================================================================
// Loop Configuration
// =============================================================================

/// Distributor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributorConfig {
    /// Time between distribution cycles (default: 60s).
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_DISTRIBUTION_INTERVAL,
        }
    }
}

/// Producer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Shortest delay between samples (default: 500ms).
    #[serde(with = "humantime_serde")]
    pub min_interval: Duration,

    /// Longest delay between samples (default: 15s).
    #[serde(with = "humantime_serde")]
    pub max_interval: Duration,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Spool configuration.
    pub spool: SpoolConfig,

    /// Remote collector the distributor delivers to.
    pub collector: TransmitterConfig,

    /// Distributor configuration.
    pub distributor: DistributorConfig,

    /// Producer configuration.
    pub producer: ProducerConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spool.dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "spool dir must not be empty".to_string(),
            ));
        }

        if self.collector.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "collector host must not be empty".to_string(),
            ));
        }

        if self.collector.port == 0 {
            return Err(ConfigError::ValidationError(
                "collector port must be non-zero".to_string(),
            ));
        }

        if !self.collector.path.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "collector path must start with '/': '{}'",
                self.collector.path
            )));
        }

        if let Some(timeout) = self.collector.timeout {
            require_positive("collector timeout", timeout)?;
        }

        require_positive("distributor interval", self.distributor.interval)?;
        require_positive("producer min_interval", self.producer.min_interval)?;
        require_positive("producer max_interval", self.producer.max_interval)?;

        if self.producer.min_interval > self.producer.max_interval {
            return Err(ConfigError::ValidationError(format!(
                "producer min_interval ({:?}) exceeds max_interval ({:?})",
                self.producer.min_interval, self.producer.max_interval
            )));
        }

        Ok(())
    }

    /// Jittered schedule for the producer.
    pub fn producer_schedule(&self) -> Result<Schedule, ConfigError> {
        Schedule::jittered(self.producer.min_interval, self.producer.max_interval)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Fixed schedule for the distributor.
    pub fn distributor_schedule(&self) -> Result<Schedule, ConfigError> {
        Schedule::interval(self.distributor.interval)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
