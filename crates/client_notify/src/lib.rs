//! Cross-context notifications from background work to a single bound consumer.
//!
//! Producers package an outcome into an [`Envelope`] (an [`Action`] plus optional sub type, error
//! message, and token re-issue hint) and hand it to a [`Dispatcher`]. The dispatcher posts it to
//! the inbox of the bound [`ConsumerLoop`], which handles envelopes in arrival order on its own
//! thread. [`ImmediateConsumer`] keeps the older synchronous behavior available for callers that
//! depend on it.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod action;
pub mod consumer;
pub mod dispatcher;
pub mod envelope;
pub mod error;

pub use action::{actions, Action};
pub use consumer::{
    spawn_consumer, ConsumerLoop, ConsumerRef, ConsumerThread, EnvelopeHandler, ImmediateConsumer,
};
pub use dispatcher::{DeliveryMode, Dispatcher};
pub use envelope::{
    Envelope, EnvelopeKey, EnvelopeOptions, NewTokenReason, Payload, PayloadValue, SubType,
};
pub use error::EnvelopeError;
