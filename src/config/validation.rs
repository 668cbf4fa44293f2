//! Configuration validation utilities.

use std::time::Duration;

use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Parse duration string using humantime.
///
/// Supports various formats: `500ms`, `30s`, `1m`, `5m30s`, `1h`, etc.
///
/// # Examples
///
/// ```
/// use data_collector::config::parse_duration;
///
/// assert_eq!(parse_duration("500ms").unwrap().as_millis(), 500);
/// assert_eq!(parse_duration("15s").unwrap().as_secs(), 15);
/// assert_eq!(parse_duration("1m").unwrap().as_secs(), 60);
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string is empty".to_string());
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Reject a zero duration.
pub(crate) fn require_positive(name: &str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be positive"
        )));
    }
    Ok(())
}
