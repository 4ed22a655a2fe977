//! Tracing subscriber installation.

use tracing_subscriber::EnvFilter;

use crate::{
    config::LoggingConfig,
    error::{RuntimeError, RuntimeResult},
};

/// Installs a global fmt subscriber filtered by `RUST_LOG`, or by the configured filter when the
/// variable is unset.
///
/// # Errors
///
/// Returns [`RuntimeError::Telemetry`] when the filter is invalid or a subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> RuntimeResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|err| RuntimeError::Telemetry(err.to_string()))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .map_err(|err| RuntimeError::Telemetry(err.to_string()))
}
