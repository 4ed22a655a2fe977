//! Process-level composition for the client.
//!
//! The entry point loads a [`ClientConfig`], installs tracing with [`init_tracing`], selects
//! platform services, and builds a [`ClientContext`] that owns the notification dispatcher and its
//! consumer for the lifetime of the process.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod context;
pub mod error;
pub mod telemetry;

pub use config::{ClientConfig, ConfigLoader, LoggingConfig, NotificationConfig, SettingsConfig};
pub use context::{AttachedConsumer, ClientContext};
pub use error::{RuntimeError, RuntimeResult};
pub use telemetry::init_tracing;
