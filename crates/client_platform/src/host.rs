//! Platform service bundle injected into the client context.

use std::sync::Arc;

use crate::{
    credentials::{CredentialStore, MemoryCredentialStore, NoopCredentialStore},
    network::{NetworkStatusProvider, NoopNetworkStatusProvider},
    storage::prefs::{MemoryPrefsStore, NoopPrefsStore, PrefsStore},
    window::{MemoryWindowMetrics, NoopWindowMetrics, WindowMetricsProvider},
};

/// Host availability state for one platform service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityStatus {
    /// Service is backed by a real platform implementation.
    Available,
    /// Service is a no-op stand-in returning sentinels.
    Unavailable,
}

impl CapabilityStatus {
    /// Returns whether the service is backed by the platform.
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Per-service availability snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceCapabilities {
    /// Network status provider availability.
    pub network_status: CapabilityStatus,
    /// Account credential store availability.
    pub credentials: CapabilityStatus,
    /// Persisted settings availability.
    pub prefs: CapabilityStatus,
    /// Window metrics availability.
    pub window_metrics: CapabilityStatus,
}

impl ServiceCapabilities {
    /// Snapshot where every service is available.
    pub const fn all_available() -> Self {
        Self {
            network_status: CapabilityStatus::Available,
            credentials: CapabilityStatus::Available,
            prefs: CapabilityStatus::Available,
            window_metrics: CapabilityStatus::Available,
        }
    }

    /// Snapshot where every service is a no-op.
    pub const fn none_available() -> Self {
        Self {
            network_status: CapabilityStatus::Unavailable,
            credentials: CapabilityStatus::Unavailable,
            prefs: CapabilityStatus::Unavailable,
            window_metrics: CapabilityStatus::Unavailable,
        }
    }
}

/// Platform services selected by the process entry point.
///
/// The bundle is assembled once before the client context is initialized; components receive it
/// (or the service they need) explicitly instead of reaching for a process-wide application object.
#[derive(Clone)]
pub struct ClientServices {
    /// Connectivity queries.
    pub network: Arc<dyn NetworkStatusProvider>,
    /// Account credential lookups.
    pub credentials: Arc<dyn CredentialStore>,
    /// Persisted key-value settings.
    pub prefs: Arc<dyn PrefsStore>,
    /// Window/screen metrics.
    pub window_metrics: Arc<dyn WindowMetricsProvider>,
    /// Availability snapshot of the services above.
    pub capabilities: ServiceCapabilities,
}

impl ClientServices {
    /// Bundle of no-op services returning sentinel values.
    pub fn noop() -> Self {
        Self {
            network: Arc::new(NoopNetworkStatusProvider),
            credentials: Arc::new(NoopCredentialStore),
            prefs: Arc::new(NoopPrefsStore),
            window_metrics: Arc::new(NoopWindowMetrics),
            capabilities: ServiceCapabilities::none_available(),
        }
    }

    /// Bundle of in-memory services, used by tests and headless runs.
    ///
    /// Network status stays a no-op since there is no interface state to report.
    pub fn in_memory() -> Self {
        Self {
            network: Arc::new(NoopNetworkStatusProvider),
            credentials: Arc::new(MemoryCredentialStore::default()),
            prefs: Arc::new(MemoryPrefsStore::default()),
            window_metrics: Arc::new(MemoryWindowMetrics::default()),
            capabilities: ServiceCapabilities {
                network_status: CapabilityStatus::Unavailable,
                ..ServiceCapabilities::all_available()
            },
        }
    }

    /// Replaces the prefs service and marks it available.
    pub fn with_prefs(mut self, prefs: Arc<dyn PrefsStore>) -> Self {
        self.prefs = prefs;
        self.capabilities.prefs = CapabilityStatus::Available;
        self
    }

    /// Replaces the network status provider and marks it available.
    pub fn with_network(mut self, network: Arc<dyn NetworkStatusProvider>) -> Self {
        self.network = network;
        self.capabilities.network_status = CapabilityStatus::Available;
        self
    }
}
