//! Notification envelopes and their key-value wire form.
//!
//! An [`Envelope`] is the typed model. The legacy generic container is [`Payload`], an
//! insertion-ordered map from [`EnvelopeKey`] names (or caller extras) to [`PayloadValue`]s;
//! [`Envelope::to_payload`] and [`Envelope::from_payload`] convert between the two.

use std::num::NonZeroU32;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{action::Action, error::EnvelopeError};

/// Field names owned by the envelope itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKey {
    /// Action identifier.
    Action,
    /// Completion classifier.
    SubType,
    /// Failure description.
    ErrorMessage,
    /// Token re-issue hint.
    NewTokenReason,
}

impl EnvelopeKey {
    /// Every reserved key, in wire order.
    pub const ALL: [Self; 4] = [
        Self::Action,
        Self::SubType,
        Self::ErrorMessage,
        Self::NewTokenReason,
    ];

    /// Returns the wire name of the key.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::SubType => "subType",
            Self::ErrorMessage => "errorMessage",
            Self::NewTokenReason => "newTokenReason",
        }
    }

    /// Looks up a reserved key by wire name.
    pub fn from_wire(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == raw)
    }
}

/// Classifier distinguishing kinds of asynchronous completion.
///
/// Raw value 0 is the "not applicable" sentinel and has no `SubType`; see [`SubType::from_raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SubType(NonZeroU32);

const fn known_sub_type(raw: u32) -> SubType {
    match NonZeroU32::new(raw) {
        Some(raw) => SubType(raw),
        None => panic!("sub types are non-zero"),
    }
}

impl SubType {
    /// Song list fetch.
    pub const ASYNC_SONGS: Self = known_sub_type(1);
    /// Album list fetch.
    pub const ASYNC_ALBUMS: Self = known_sub_type(2);
    /// Artist list fetch.
    pub const ASYNC_ARTISTS: Self = known_sub_type(3);
    /// Playlist fetch.
    pub const ASYNC_PLAYLISTS: Self = known_sub_type(4);
    /// Cover art download.
    pub const ASYNC_COVER_ART: Self = known_sub_type(5);

    /// Maps a raw classifier to a sub type; 0 yields `None`.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    /// Returns the raw classifier value.
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl TryFrom<u32> for SubType {
    type Error = EnvelopeError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::from_raw(raw).ok_or(EnvelopeError::MalformedField {
            key: EnvelopeKey::SubType.as_str(),
        })
    }
}

impl From<SubType> for u32 {
    fn from(sub_type: SubType) -> Self {
        sub_type.get()
    }
}

/// Why a failure may be fixed by issuing a new authentication token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NewTokenReason {
    /// A retry with a new token is worth trying, with no specific cause.
    None,
    /// The cached token is suspected stale.
    Cache,
}

impl NewTokenReason {
    /// Returns the wire token.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Cache => "CACHE",
        }
    }

    /// Parses a wire token.
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "NONE" => Some(Self::None),
            "CACHE" => Some(Self::Cache),
            _ => None,
        }
    }
}

/// Scalar value stored in a [`Payload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    /// Integer entry.
    Int(i64),
    /// Text entry.
    Text(String),
}

impl PayloadValue {
    /// Returns the text value, if this is a text entry.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Int(_) => None,
        }
    }

    /// Returns the integer value, if this is an integer entry.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Text(_) => None,
        }
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for PayloadValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Insertion-ordered key-value container carried by the legacy wire form.
pub type Payload = IndexMap<String, PayloadValue>;

/// Failure details; a token reason can only exist inside one.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Failure {
    message: String,
    new_token_reason: Option<NewTokenReason>,
}

/// Optional envelope fields for [`Envelope::build`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvelopeOptions {
    /// Completion classifier.
    pub sub_type: Option<SubType>,
    /// Failure description.
    pub error_message: Option<String>,
    /// Token re-issue hint; requires `error_message`.
    pub new_token_reason: Option<NewTokenReason>,
    /// Caller extras; must not use reserved keys.
    pub extras: Payload,
}

impl EnvelopeOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the completion classifier.
    pub fn sub_type(mut self, sub_type: SubType) -> Self {
        self.sub_type = Some(sub_type);
        self
    }

    /// Sets the failure description.
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Sets the token re-issue hint.
    pub fn new_token_reason(mut self, reason: NewTokenReason) -> Self {
        self.new_token_reason = Some(reason);
        self
    }

    /// Adds a caller extra.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<PayloadValue>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }
}

/// Cross-context notification unit.
///
/// Built once by a producer, delivered once, then dropped. There are no mutating accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Payload", into = "Payload")]
pub struct Envelope {
    action: Action,
    sub_type: Option<SubType>,
    failure: Option<Failure>,
    extras: Payload,
}

impl Envelope {
    /// Builds an envelope, rejecting invalid field combinations.
    ///
    /// # Errors
    ///
    /// - [`EnvelopeError::EmptyAction`] when `action` is empty.
    /// - [`EnvelopeError::TokenReasonWithoutError`] when a token reason has no error message.
    /// - [`EnvelopeError::ReservedExtraKey`] when an extra shadows an envelope field.
    pub fn build(action: impl AsRef<str>, options: EnvelopeOptions) -> Result<Self, EnvelopeError> {
        let action = Action::new(action.as_ref())?;
        if let Some(key) = options
            .extras
            .keys()
            .find(|key| EnvelopeKey::from_wire(key).is_some())
        {
            return Err(EnvelopeError::ReservedExtraKey(key.clone()));
        }
        let failure = match (options.error_message, options.new_token_reason) {
            (Some(message), new_token_reason) => Some(Failure {
                message,
                new_token_reason,
            }),
            (None, Some(_)) => return Err(EnvelopeError::TokenReasonWithoutError),
            (None, None) => None,
        };
        Ok(Self {
            action,
            sub_type: options.sub_type,
            failure,
            extras: options.extras,
        })
    }

    /// Envelope carrying only an action.
    pub fn bare(action: Action) -> Self {
        Self {
            action,
            sub_type: None,
            failure: None,
            extras: Payload::new(),
        }
    }

    /// Envelope over a caller payload.
    ///
    /// The payload is used as-is when present, otherwise an empty one is created. `action` always
    /// replaces any `action` entry; `sub_type`, when given, replaces any `subType` entry. Other
    /// reserved entries in the payload are lifted into typed fields; malformed ones, and a token
    /// reason without an error message, are dropped.
    pub fn with_payload(action: Action, payload: Option<Payload>, sub_type: Option<SubType>) -> Self {
        let mut extras = payload.unwrap_or_default();
        let lifted = LiftedFields::take_from(&mut extras);
        let failure = match (lifted.error_message, lifted.new_token_reason) {
            (Some(message), new_token_reason) => Some(Failure {
                message,
                new_token_reason,
            }),
            (None, Some(reason)) => {
                debug!(%action, reason = reason.as_str(), "dropping token reason without error");
                None
            }
            (None, None) => None,
        };
        Self {
            action,
            sub_type: sub_type.or(lifted.sub_type),
            failure,
            extras,
        }
    }

    /// Failure envelope; `error_text` of `None` yields an envelope without an error message.
    pub fn failure(action: Action, sub_type: Option<SubType>, error_text: Option<&str>) -> Self {
        Self {
            action,
            sub_type,
            failure: error_text.map(|message| Failure {
                message: message.to_string(),
                new_token_reason: None,
            }),
            extras: Payload::new(),
        }
    }

    /// Failure envelope with a token re-issue hint.
    ///
    /// Without `error_text` the hint has nothing to qualify and is dropped.
    pub fn failure_with_token_reason(
        action: Action,
        sub_type: Option<SubType>,
        error_text: Option<&str>,
        reason: NewTokenReason,
    ) -> Self {
        if error_text.is_none() {
            debug!(%action, reason = reason.as_str(), "dropping token reason without error");
        }
        Self {
            action,
            sub_type,
            failure: error_text.map(|message| Failure {
                message: message.to_string(),
                new_token_reason: Some(reason),
            }),
            extras: Payload::new(),
        }
    }

    /// Action identifier.
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Completion classifier, absent when not applicable.
    pub fn sub_type(&self) -> Option<SubType> {
        self.sub_type
    }

    /// Failure description, present only on failure paths.
    pub fn error_message(&self) -> Option<&str> {
        self.failure.as_ref().map(|failure| failure.message.as_str())
    }

    /// Token re-issue hint; never present without [`Self::error_message`].
    pub fn new_token_reason(&self) -> Option<NewTokenReason> {
        self.failure
            .as_ref()
            .and_then(|failure| failure.new_token_reason)
    }

    /// Whether the envelope reports a failure.
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    /// Caller extras, excluding reserved keys.
    pub fn extras(&self) -> &Payload {
        &self.extras
    }

    /// Renders the key-value wire form: caller extras first, then envelope fields.
    pub fn to_payload(&self) -> Payload {
        let mut payload = self.extras.clone();
        payload.insert(
            EnvelopeKey::Action.as_str().to_string(),
            PayloadValue::Text(self.action.as_str().to_string()),
        );
        if let Some(sub_type) = self.sub_type {
            payload.insert(
                EnvelopeKey::SubType.as_str().to_string(),
                PayloadValue::Int(i64::from(sub_type.get())),
            );
        }
        if let Some(failure) = &self.failure {
            payload.insert(
                EnvelopeKey::ErrorMessage.as_str().to_string(),
                PayloadValue::Text(failure.message.clone()),
            );
            if let Some(reason) = failure.new_token_reason {
                payload.insert(
                    EnvelopeKey::NewTokenReason.as_str().to_string(),
                    PayloadValue::Text(reason.as_str().to_string()),
                );
            }
        }
        payload
    }

    /// Parses the key-value wire form.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::MissingAction`] without an action entry,
    /// [`EnvelopeError::MalformedField`] for badly typed reserved entries (a `subType` of 0
    /// included), and [`EnvelopeError::TokenReasonWithoutError`] for an orphan token reason.
    pub fn from_payload(mut payload: Payload) -> Result<Self, EnvelopeError> {
        let action = match payload.shift_remove(EnvelopeKey::Action.as_str()) {
            Some(PayloadValue::Text(raw)) => Action::new(raw)?,
            Some(PayloadValue::Int(_)) => {
                return Err(EnvelopeError::MalformedField {
                    key: EnvelopeKey::Action.as_str(),
                })
            }
            None => return Err(EnvelopeError::MissingAction),
        };
        let sub_type = match payload.shift_remove(EnvelopeKey::SubType.as_str()) {
            Some(value) => Some(parse_sub_type(&value)?),
            None => None,
        };
        let error_message = match payload.shift_remove(EnvelopeKey::ErrorMessage.as_str()) {
            Some(PayloadValue::Text(message)) => Some(message),
            Some(PayloadValue::Int(_)) => {
                return Err(EnvelopeError::MalformedField {
                    key: EnvelopeKey::ErrorMessage.as_str(),
                })
            }
            None => None,
        };
        let new_token_reason = match payload.shift_remove(EnvelopeKey::NewTokenReason.as_str()) {
            Some(value) => Some(parse_token_reason(&value)?),
            None => None,
        };
        Self::build(
            action,
            EnvelopeOptions {
                sub_type,
                error_message,
                new_token_reason,
                extras: payload,
            },
        )
    }
}

fn parse_sub_type(value: &PayloadValue) -> Result<SubType, EnvelopeError> {
    value
        .as_int()
        .and_then(|raw| u32::try_from(raw).ok())
        .and_then(SubType::from_raw)
        .ok_or(EnvelopeError::MalformedField {
            key: EnvelopeKey::SubType.as_str(),
        })
}

fn parse_token_reason(value: &PayloadValue) -> Result<NewTokenReason, EnvelopeError> {
    value
        .as_text()
        .and_then(NewTokenReason::from_wire)
        .ok_or(EnvelopeError::MalformedField {
            key: EnvelopeKey::NewTokenReason.as_str(),
        })
}

/// Reserved entries pulled out of a caller payload.
#[derive(Default)]
struct LiftedFields {
    sub_type: Option<SubType>,
    error_message: Option<String>,
    new_token_reason: Option<NewTokenReason>,
}

impl LiftedFields {
    fn take_from(payload: &mut Payload) -> Self {
        let mut lifted = Self::default();
        for key in EnvelopeKey::ALL {
            let Some(value) = payload.shift_remove(key.as_str()) else {
                continue;
            };
            match key {
                EnvelopeKey::Action => {}
                EnvelopeKey::SubType => lifted.sub_type = parse_sub_type(&value).ok(),
                EnvelopeKey::ErrorMessage => {
                    lifted.error_message = value.as_text().map(str::to_string);
                }
                EnvelopeKey::NewTokenReason => {
                    lifted.new_token_reason = parse_token_reason(&value).ok();
                }
            }
        }
        lifted
    }
}

impl TryFrom<Payload> for Envelope {
    type Error = EnvelopeError;

    fn try_from(payload: Payload) -> Result<Self, Self::Error> {
        Self::from_payload(payload)
    }
}

impl From<Envelope> for Payload {
    fn from(envelope: Envelope) -> Self {
        envelope.to_payload()
    }
}
