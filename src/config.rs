//! Session configuration.
//!
//! All fields have defaults matching the device's observed timing, so
//! `SessionConfig::default()` is the usual choice. Configuration can also be
//! loaded from JSON, where missing fields fall back to their defaults:
//!
//! ```
//! use omron_hid::SessionConfig;
//!
//! let config = SessionConfig::from_json_str(r#"{ "label": "bp-meter", "read_timeout_ms": 2000 }"#).unwrap();
//! assert_eq!(config.label, "bp-meter");
//! assert_eq!(config.read_timeout_ms, 2000);
//! assert_eq!(config.flush_timeout_ms, 100);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OmronError, Result};

/// Default timeout for data reads and writes.
pub const DEFAULT_IO_TIMEOUT_MS: u64 = 1000;

/// Default poll timeout while flushing stale input.
pub const DEFAULT_FLUSH_TIMEOUT_MS: u64 = 100;

/// Default length of the all-zero clear command.
pub const DEFAULT_CLEAR_COMMAND_LEN: usize = 23;

/// Configuration for a device session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name recorded on the session's log span.
    pub label: String,
    /// Timeout for reading a response report. Expiry is a device error.
    pub read_timeout_ms: u64,
    /// Timeout for writing a command report.
    pub write_timeout_ms: u64,
    /// Poll timeout while flushing queued input. Expiry ends the flush.
    pub flush_timeout_ms: u64,
    /// Timeout for the mode-switch feature report.
    pub mode_timeout_ms: u64,
    /// Length of the all-zero command sent by the clear handshake.
    pub clear_command_len: usize,
    /// Re-send the mode switch even when the session is already in that mode.
    ///
    /// Some devices forget their mode between commands.
    pub always_switch_mode: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            label: "omron".to_string(),
            read_timeout_ms: DEFAULT_IO_TIMEOUT_MS,
            write_timeout_ms: DEFAULT_IO_TIMEOUT_MS,
            flush_timeout_ms: DEFAULT_FLUSH_TIMEOUT_MS,
            mode_timeout_ms: DEFAULT_IO_TIMEOUT_MS,
            clear_command_len: DEFAULT_CLEAR_COMMAND_LEN,
            always_switch_mode: false,
        }
    }
}

impl SessionConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| OmronError::BadArgument(format!("invalid session config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the log span label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the data read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the report write timeout.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the flush poll timeout.
    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the mode-switch timeout.
    pub fn with_mode_timeout(mut self, timeout: Duration) -> Self {
        self.mode_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the clear command length.
    pub fn with_clear_command_len(mut self, len: usize) -> Self {
        self.clear_command_len = len;
        self
    }

    /// Always re-send the mode switch before a command.
    pub fn with_always_switch_mode(mut self, always: bool) -> Self {
        self.always_switch_mode = always;
        self
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if self.clear_command_len == 0 {
            return Err(OmronError::BadArgument(
                "clear_command_len must be at least 1".to_string(),
            ));
        }
        let timeouts = [
            ("read_timeout_ms", self.read_timeout_ms),
            ("write_timeout_ms", self.write_timeout_ms),
            ("flush_timeout_ms", self.flush_timeout_ms),
            ("mode_timeout_ms", self.mode_timeout_ms),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(OmronError::BadArgument(format!("{} must be non-zero", name)));
            }
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    #[inline]
    pub(crate) fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    #[inline]
    pub(crate) fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }

    #[inline]
    pub(crate) fn mode_timeout(&self) -> Duration {
        Duration::from_millis(self.mode_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.read_timeout(), Duration::from_millis(1000));
        assert_eq!(config.flush_timeout(), Duration::from_millis(100));
        assert_eq!(config.clear_command_len, 23);
        assert!(!config.always_switch_mode);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_setters() {
        let config = SessionConfig::new()
            .with_label("pedometer")
            .with_read_timeout(Duration::from_millis(250))
            .with_write_timeout(Duration::from_millis(300))
            .with_flush_timeout(Duration::from_millis(20))
            .with_mode_timeout(Duration::from_secs(2))
            .with_clear_command_len(12)
            .with_always_switch_mode(true);

        assert_eq!(config.label, "pedometer");
        assert_eq!(config.read_timeout_ms, 250);
        assert_eq!(config.write_timeout(), Duration::from_millis(300));
        assert_eq!(config.flush_timeout_ms, 20);
        assert_eq!(config.mode_timeout(), Duration::from_secs(2));
        assert_eq!(config.clear_command_len, 12);
        assert!(config.always_switch_mode);
    }

    #[test]
    fn test_json_partial_uses_defaults() {
        let config = SessionConfig::from_json_str(r#"{"always_switch_mode": true}"#).unwrap();
        assert!(config.always_switch_mode);
        assert_eq!(config.label, "omron");
        assert_eq!(config.write_timeout_ms, DEFAULT_IO_TIMEOUT_MS);
    }

    #[test]
    fn test_json_invalid_rejected() {
        let result = SessionConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(OmronError::BadArgument(_))));
    }

    #[test]
    fn test_zero_values_rejected() {
        let result = SessionConfig::from_json_str(r#"{"clear_command_len": 0}"#);
        assert!(result.unwrap_err().to_string().contains("clear_command_len"));

        let config = SessionConfig::default().with_read_timeout(Duration::ZERO);
        assert!(config.validate().unwrap_err().to_string().contains("read_timeout_ms"));
    }
}
