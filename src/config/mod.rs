//! Configuration module for the data collector.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Spool settings (directory)
//! - Collector endpoint (host, port, path, request timeout)
//! - Distributor and producer intervals

mod app;
mod validation;

pub use app::{AppConfig, DistributorConfig, ProducerConfig, SpoolConfig};
pub use validation::{ConfigError, parse_duration};

// Re-export constants
pub use app::DEFAULT_SPOOL_DIR;
