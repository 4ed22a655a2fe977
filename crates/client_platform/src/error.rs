//! Error type shared by platform-service adapters.

use thiserror::Error;

/// Failure raised by a platform-service adapter.
///
/// Callers in the notification and settings paths usually collapse these into sentinel values
/// (absent, default, empty) instead of surfacing them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The backing store could not be read or written.
    #[error("storage failure: {0}")]
    Storage(String),
    /// A stored value could not be encoded or decoded.
    #[error("serialization failure: {0}")]
    Serialization(String),
    /// The key is not acceptable to the store.
    #[error("invalid key `{0}`")]
    InvalidKey(String),
}

impl From<serde_json::Error> for PlatformError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience result alias for platform-service operations.
pub type PlatformResult<T> = Result<T, PlatformError>;
