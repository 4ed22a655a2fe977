//! Envelope construction and decoding errors.

use thiserror::Error;

/// Rejected envelope input.
///
/// Only the canonical builder ([`Envelope::build`](crate::Envelope::build)) and payload decoding
/// return these. The legacy call shapes and every delivery path are infallible.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The action identifier was empty.
    #[error("envelope action must not be empty")]
    EmptyAction,
    /// A token reason was supplied without an error message.
    #[error("newTokenReason requires errorMessage")]
    TokenReasonWithoutError,
    /// A caller extra used one of the envelope's own field keys.
    #[error("`{0}` is a reserved envelope key")]
    ReservedExtraKey(String),
    /// A decoded payload had no `action` entry.
    #[error("payload has no `action` entry")]
    MissingAction,
    /// A decoded payload field had the wrong type or an unknown value.
    #[error("payload field `{key}` is malformed")]
    MalformedField {
        /// Wire key of the offending field.
        key: &'static str,
    },
}
