//! Runtime composition errors.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while assembling or tearing down the client runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration could not be read or parsed.
    #[error("invalid configuration ({}): {message}", config_origin(.path))]
    Config {
        /// File the configuration came from, when it came from a file.
        path: Option<PathBuf>,
        /// Human-readable cause.
        message: String,
    },
    /// A consumer thread could not be started.
    #[error("failed to start consumer `{name}`: {source}")]
    ConsumerSpawn {
        /// Consumer name.
        name: String,
        /// OS error.
        #[source]
        source: std::io::Error,
    },
    /// The tracing subscriber could not be installed.
    #[error("failed to initialize tracing: {0}")]
    Telemetry(String),
}

impl RuntimeError {
    /// Configuration error without a backing file.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            path: None,
            message: message.into(),
        }
    }
}

fn config_origin(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map_or_else(|| "inline".to_string(), |path| path.display().to_string())
}

/// Convenience result alias for runtime composition.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
