//! Account credential lookup contracts.
//!
//! Lookups never fail from the caller's point of view: any backend error, unknown account, or
//! missing credential service collapses to `None`.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use futures::future::BoxFuture;
use tracing::debug;

use crate::error::{PlatformError, PlatformResult};

/// Object-safe boxed future used by credential contracts.
pub type CredentialFuture<'a, T> = BoxFuture<'a, T>;

/// Identifies an account registered with the platform account store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountRef {
    /// Account display name.
    pub name: String,
    /// Platform account type the account belongs to.
    pub account_type: String,
}

impl AccountRef {
    /// Creates an account reference.
    pub fn new(name: impl Into<String>, account_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            account_type: account_type.into(),
        }
    }
}

/// Host service resolving per-account connection data.
pub trait CredentialStore: Send + Sync {
    /// Returns the server URL stored for `account`, or `None` on any failure.
    fn lookup_server_url<'a>(&'a self, account: &'a AccountRef)
        -> CredentialFuture<'a, Option<String>>;
}

/// Raw platform account store whose failures are still visible.
pub trait CredentialBackend: Send + Sync {
    /// Reads the server URL user-data field for `account`.
    fn read_server_url<'a>(
        &'a self,
        account: &'a AccountRef,
    ) -> CredentialFuture<'a, PlatformResult<Option<String>>>;
}

/// Resolves a server URL through an optional credential service.
pub async fn lookup_server_url_with(
    store: Option<&dyn CredentialStore>,
    account: &AccountRef,
) -> Option<String> {
    match store {
        Some(store) => store.lookup_server_url(account).await,
        None => {
            debug!(account = %account.name, "no credential store registered");
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// Credential store for hosts without an account service.
pub struct NoopCredentialStore;

impl CredentialStore for NoopCredentialStore {
    fn lookup_server_url<'a>(
        &'a self,
        _account: &'a AccountRef,
    ) -> CredentialFuture<'a, Option<String>> {
        Box::pin(async { None })
    }
}

#[derive(Debug, Clone)]
/// Adapter turning every [`CredentialBackend`] failure into an absent value.
pub struct ResilientCredentialStore<B> {
    backend: B,
}

impl<B: CredentialBackend> ResilientCredentialStore<B> {
    /// Wraps a raw backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

impl<B: CredentialBackend> CredentialStore for ResilientCredentialStore<B> {
    fn lookup_server_url<'a>(
        &'a self,
        account: &'a AccountRef,
    ) -> CredentialFuture<'a, Option<String>> {
        Box::pin(async move {
            match self.backend.read_server_url(account).await {
                Ok(url) => url,
                Err(err) => {
                    debug!(account = %account.name, %err, "credential lookup failed");
                    None
                }
            }
        })
    }
}

#[derive(Debug, Clone, Default)]
/// In-memory account table keyed by [`AccountRef`].
pub struct MemoryCredentialStore {
    server_urls: Arc<RwLock<HashMap<AccountRef, String>>>,
}

impl MemoryCredentialStore {
    /// Registers or replaces the server URL for an account.
    pub fn insert_server_url(&self, account: AccountRef, server_url: impl Into<String>) {
        let mut urls = match self.server_urls.write() {
            Ok(urls) => urls,
            Err(poisoned) => poisoned.into_inner(),
        };
        urls.insert(account, server_url.into());
    }
}

impl CredentialBackend for MemoryCredentialStore {
    fn read_server_url<'a>(
        &'a self,
        account: &'a AccountRef,
    ) -> CredentialFuture<'a, PlatformResult<Option<String>>> {
        Box::pin(async move {
            let urls = self
                .server_urls
                .read()
                .map_err(|_| PlatformError::Storage("credential table lock poisoned".into()))?;
            Ok(urls.get(account).cloned())
        })
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn lookup_server_url<'a>(
        &'a self,
        account: &'a AccountRef,
    ) -> CredentialFuture<'a, Option<String>> {
        Box::pin(async move { self.read_server_url(account).await.ok().flatten() })
    }
}
