//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` from the logging config section. The
//! level string accepts full `EnvFilter` directives, so both "info" and
//! "channel_protocol=debug,warn" work.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};

/// Install the global subscriber. Call once at process start; a second call
/// fails because the global default is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| ProtocolError::ConfigError(format!("invalid log filter: {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| ProtocolError::ConfigError(format!("failed to install subscriber: {e}")))
}
