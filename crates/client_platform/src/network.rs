//! Network availability contracts.

use serde::{Deserialize, Serialize};

/// Aggregated connectivity across every known network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkStatus {
    /// The platform connectivity service is unavailable.
    Unknown,
    /// No interface is connected.
    None,
    /// At least one interface is connected.
    Exists,
}

impl NetworkStatus {
    /// Returns a stable string token for diagnostics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::None => "none",
            Self::Exists => "exists",
        }
    }

    /// Returns whether a network call is worth attempting.
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Exists)
    }
}

/// One platform network interface as reported by the connectivity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    /// Platform name of the interface (`wifi`, `mobile`, ...).
    pub name: String,
    /// Whether the interface currently carries traffic.
    pub connected: bool,
}

impl NetworkInterface {
    /// Creates an interface record.
    pub fn new(name: impl Into<String>, connected: bool) -> Self {
        Self {
            name: name.into(),
            connected,
        }
    }
}

/// Folds interface states into one status: `Exists` if any interface is connected, else `None`.
pub fn aggregate_network_status(interfaces: &[NetworkInterface]) -> NetworkStatus {
    if interfaces.iter().any(|interface| interface.connected) {
        NetworkStatus::Exists
    } else {
        NetworkStatus::None
    }
}

/// Platform source of raw interface state.
pub trait NetworkInterfaceSource: Send + Sync {
    /// Lists known interfaces, or `None` when the connectivity service is unavailable.
    fn interfaces(&self) -> Option<Vec<NetworkInterface>>;
}

/// Host service answering "is there a usable network right now".
pub trait NetworkStatusProvider: Send + Sync {
    /// Returns the current aggregated status.
    fn current_status(&self) -> NetworkStatus;
}

#[derive(Debug, Clone, Copy, Default)]
/// Provider for platforms without a connectivity service; always [`NetworkStatus::Unknown`].
pub struct NoopNetworkStatusProvider;

impl NetworkStatusProvider for NoopNetworkStatusProvider {
    fn current_status(&self) -> NetworkStatus {
        NetworkStatus::Unknown
    }
}

#[derive(Debug, Clone, Default)]
/// Provider aggregating the interfaces reported by a [`NetworkInterfaceSource`].
pub struct InterfaceNetworkStatus<S> {
    source: S,
}

impl<S: NetworkInterfaceSource> InterfaceNetworkStatus<S> {
    /// Wraps an interface source.
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: NetworkInterfaceSource> NetworkStatusProvider for InterfaceNetworkStatus<S> {
    fn current_status(&self) -> NetworkStatus {
        match self.source.interfaces() {
            Some(interfaces) => aggregate_network_status(&interfaces),
            None => NetworkStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Fixed interface list, used in tests and on hosts that push state in from outside.
pub struct StaticInterfaceSource {
    interfaces: Option<Vec<NetworkInterface>>,
}

impl StaticInterfaceSource {
    /// Source reporting the given interfaces.
    pub fn new(interfaces: Vec<NetworkInterface>) -> Self {
        Self {
            interfaces: Some(interfaces),
        }
    }

    /// Source whose connectivity service is unavailable.
    pub fn unavailable() -> Self {
        Self { interfaces: None }
    }
}

impl NetworkInterfaceSource for StaticInterfaceSource {
    fn interfaces(&self) -> Option<Vec<NetworkInterface>> {
        self.interfaces.clone()
    }
}
