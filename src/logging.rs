//! Logging setup
//!
//! The crate emits `tracing` events; installing a subscriber is left to the
//! embedding application. `init_logging` is a convenience for applications
//! that want the configured level and format on stderr.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, ManagerConfig};
use crate::schema::{SchemaError, SchemaResult};

/// Build the filter from the configured directive
fn build_env_filter(level: &str) -> SchemaResult<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| SchemaError::config(format!("Invalid tracing filter '{}': {}", level, e)))
}

/// Install a global `tracing-subscriber` for the configured level and format.
///
/// Returns `Ok(false)` when a global subscriber was already installed.
pub fn init_logging(config: &ManagerConfig) -> SchemaResult<bool> {
    let filter = build_env_filter(&config.log_level)?;

    let installed = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init(),
        LogFormat::Compact => tracing_subscriber::fmt()
            .compact()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    Ok(installed.is_ok())
}
