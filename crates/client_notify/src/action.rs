//! Symbolic action identifiers.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::EnvelopeError;

/// Non-empty identifier naming what an envelope reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Action(Cow<'static, str>);

impl Action {
    /// Returns an action when `raw` is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::EmptyAction`] for an empty string.
    pub fn new(raw: impl Into<String>) -> Result<Self, EnvelopeError> {
        let raw = raw.into();
        if raw.is_empty() {
            Err(EnvelopeError::EmptyAction)
        } else {
            Ok(Self(Cow::Owned(raw)))
        }
    }

    /// Creates an action from a compile-time constant.
    ///
    /// # Panics
    ///
    /// Panics when `raw` is empty; in a `const` item this is a compile error.
    pub const fn from_static(raw: &'static str) -> Self {
        assert!(!raw.is_empty(), "action identifiers must not be empty");
        Self(Cow::Borrowed(raw))
    }

    /// Returns the string form of the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Action {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Action {
    type Error = EnvelopeError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl TryFrom<&str> for Action {
    type Error = EnvelopeError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.0.into_owned()
    }
}

/// Actions emitted by the client's background work.
pub mod actions {
    use super::Action;

    /// A remote fetch finished and its results are cached.
    pub const FETCH_DONE: Action = Action::from_static("fetchDone");
    /// A remote fetch failed; the envelope carries the error text.
    pub const FETCH_FAILED: Action = Action::from_static("fetchFailed");
    /// A cache lookup finished.
    pub const CACHE_LOADED: Action = Action::from_static("cacheLoaded");
    /// The server rejected the session token; a new one must be issued.
    pub const TOKEN_REFRESH_NEEDED: Action = Action::from_static("tokenRefreshNeeded");
    /// Background work was skipped because no network is available.
    pub const NETWORK_UNAVAILABLE: Action = Action::from_static("networkUnavailable");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_action_is_rejected() {
        assert_eq!(Action::new(""), Err(EnvelopeError::EmptyAction));
        assert_eq!(Action::try_from(""), Err(EnvelopeError::EmptyAction));
    }

    #[test]
    fn owned_and_static_actions_compare_equal() {
        let owned = Action::new("fetchDone").expect("valid action");
        assert_eq!(owned, actions::FETCH_DONE);
        assert_eq!(owned.to_string(), "fetchDone");
    }

    #[test]
    fn serde_rejects_empty_action() {
        let err = serde_json::from_str::<Action>("\"\"").expect_err("empty action");
        assert!(err.to_string().contains("must not be empty"));
        let ok: Action = serde_json::from_str("\"cacheLoaded\"").expect("valid");
        assert_eq!(ok, actions::CACHE_LOADED);
    }
}
