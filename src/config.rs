//! # Configuration Management
//!
//! Centralized configuration for the channel protocol core.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-variable overrides via `from_env()`
//!
//! Values that shape protocol safety (payload ceiling, queue capacity,
//! drain timeout) live here so a deployment tunes them in one place.

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Max allowed frame payload size (4 MB). A game client has no legitimate
/// frame anywhere near this; anything larger is a hostile length claim.
pub const MAX_PAYLOAD_SIZE: usize = 4 * 1024 * 1024;

/// Default capacity of each session's outbound queue, in frames.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Main configuration structure for one channel server process.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ChannelConfig {
    /// Server-specific configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ChannelConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("CHANNEL_PROTOCOL_ADDRESS") {
            config.server.address = addr;
        }

        if let Ok(capacity) = std::env::var("CHANNEL_PROTOCOL_QUEUE_CAPACITY") {
            if let Ok(val) = capacity.parse::<usize>() {
                config.server.outbound_queue_capacity = val;
            }
        }

        if let Ok(max) = std::env::var("CHANNEL_PROTOCOL_MAX_PAYLOAD") {
            if let Ok(val) = max.parse::<usize>() {
                config.server.max_payload_size = val;
            }
        }

        if let Ok(drain) = std::env::var("CHANNEL_PROTOCOL_DRAIN_TIMEOUT_MS") {
            if let Ok(val) = drain.parse::<u64>() {
                config.server.shutdown_drain_timeout = Duration::from_millis(val);
            }
        }

        if let Ok(level) = std::env::var("CHANNEL_PROTOCOL_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Validate the configuration for common misconfigurations.
    ///
    /// Returns a list of validation errors. Empty list means the
    /// configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Server-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address for the channel listener
    #[serde(default = "default_address")]
    pub address: String,

    /// Maximum accepted frame payload size in bytes
    #[serde(default = "default_max_payload")]
    pub max_payload_size: usize,

    /// Per-session outbound queue capacity in frames
    #[serde(default = "default_queue_capacity")]
    pub outbound_queue_capacity: usize,

    /// How long a disconnecting session may spend draining its queue before
    /// remaining frames are dropped
    #[serde(default = "default_drain_timeout")]
    pub shutdown_drain_timeout: Duration,
}

fn default_address() -> String {
    "0.0.0.0:54001".to_owned()
}

fn default_max_payload() -> usize {
    MAX_PAYLOAD_SIZE
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_drain_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            max_payload_size: default_max_payload(),
            outbound_queue_capacity: default_queue_capacity(),
            shutdown_drain_timeout: default_drain_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("server.address must not be empty".to_owned());
        }

        if self.max_payload_size == 0 {
            errors.push("server.max_payload_size must be greater than zero".to_owned());
        } else if self.max_payload_size > MAX_PAYLOAD_SIZE {
            errors.push(format!(
                "server.max_payload_size {} exceeds the protocol ceiling {}",
                self.max_payload_size, MAX_PAYLOAD_SIZE
            ));
        }

        if self.outbound_queue_capacity == 0 {
            errors.push("server.outbound_queue_capacity must be greater than zero".to_owned());
        }

        if self.shutdown_drain_timeout.is_zero() {
            errors.push("server.shutdown_drain_timeout must be greater than zero".to_owned());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log filter directive, e.g. "info" or "channel_protocol=debug"
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.level.is_empty() {
            errors.push("logging.level must not be empty".to_owned());
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ChannelConfig::default();
        assert!(config.validate().is_empty());
        assert!(config.validate_strict().is_ok());
    }

    #[test]
    fn toml_round_trip_with_overrides() {
        let toml = r#"
            [server]
            address = "127.0.0.1:9100"
            outbound_queue_capacity = 32

            [logging]
            level = "debug"
        "#;
        let config = ChannelConfig::from_toml(toml).unwrap();
        assert_eq!(config.server.address, "127.0.0.1:9100");
        assert_eq!(config.server.outbound_queue_capacity, 32);
        assert_eq!(config.server.max_payload_size, MAX_PAYLOAD_SIZE);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn invalid_values_are_reported() {
        let config = ChannelConfig::default_with_overrides(|c| {
            c.server.address.clear();
            c.server.outbound_queue_capacity = 0;
        });
        let errors = config.validate();
        assert_eq!(errors.len(), 2);
        assert!(config.validate_strict().is_err());
    }

    #[test]
    fn oversized_payload_ceiling_is_rejected() {
        let config = ChannelConfig::default_with_overrides(|c| {
            c.server.max_payload_size = MAX_PAYLOAD_SIZE + 1;
        });
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let result = ChannelConfig::from_toml("[server\naddress=");
        assert!(matches!(result, Err(ProtocolError::ConfigError(_))));
    }
}
