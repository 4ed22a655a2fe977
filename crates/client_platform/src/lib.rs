//! Typed platform-service contracts for the mobile client utility layer.
//!
//! Every platform service (connectivity, account credentials, persisted settings, window metrics)
//! is an object-safe trait with a no-op adapter for hosts that lack the service and an in-memory
//! adapter for tests. Absent services answer with sentinel values instead of errors.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod credentials;
pub mod deep_copy;
pub mod error;
pub mod host;
pub mod network;
pub mod storage;
pub mod window;

pub use credentials::{
    lookup_server_url_with, AccountRef, CredentialBackend, CredentialFuture, CredentialStore,
    MemoryCredentialStore, NoopCredentialStore, ResilientCredentialStore,
};
pub use deep_copy::{
    copy_indexed_string_maps, copy_string_maps, IndexedStringMapLists, StringMap, StringMapList,
};
pub use error::{PlatformError, PlatformResult};
pub use host::{CapabilityStatus, ClientServices, ServiceCapabilities};
pub use network::{
    aggregate_network_status, InterfaceNetworkStatus, NetworkInterface, NetworkInterfaceSource,
    NetworkStatus, NetworkStatusProvider, NoopNetworkStatusProvider, StaticInterfaceSource,
};
pub use storage::prefs::{
    load_pref_with, save_pref_with, FilePrefsStore, MemoryPrefsStore, NoopPrefsStore, PrefsStore,
    PrefsStoreFuture,
};
pub use storage::recent_searches::{RecentSearchStore, RECENT_SEARCHES_NAMESPACE};
pub use storage::settings::{ScalarSettings, DEFAULT_RECENT_SONG_COUNT, RECENT_SONG_COUNT_KEY};
pub use window::{
    dimension, Dimension, HostWindow, MemoryWindowMetrics, NoopWindowMetrics, WindowMetricsProvider,
    WindowSize,
};
