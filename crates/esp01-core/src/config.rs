//! Device configuration
//!
//! Stored as JSON so a host tool can keep one file per module.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::protocol::{ProtocolError, RunnerConfig, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};

/// Settings for one ESP-01 module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Serial port name
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Reply timeout for commands without a catalog-specific one
    pub timeout_ms: u64,
    /// Rewrite `\n` to `\r\n` in the serial adapter
    pub native_line_ending: bool,
    /// Transaction limits and tracing
    pub runner: RunnerConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            native_line_ending: false,
            runner: RunnerConfig::default(),
        }
    }
}

impl DeviceConfig {
    /// Default reply timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> Result<Self, ProtocolError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ProtocolError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProtocolError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string_pretty(self).map_err(|e| ProtocolError::ConfigError(e.to_string()))
    }

    /// Write the config as JSON to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ProtocolError> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        Ok(())
    }

    /// Reject limits that could never carry a transaction
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.baud_rate == 0 {
            return Err(ProtocolError::ConfigError("baud_rate must be non-zero".into()));
        }
        if self.runner.max_frame_len < 3 {
            return Err(ProtocolError::ConfigError(format!(
                "max_frame_len {} cannot hold \"AT\\n\"",
                self.runner.max_frame_len
            )));
        }
        if self.runner.max_response_len < 3 {
            return Err(ProtocolError::ConfigError(format!(
                "max_response_len {} cannot hold \"OK\\n\"",
                self.runner.max_response_len
            )));
        }
        Ok(())
    }
}
