//! Persisted key-value settings contracts and adapters.
//!
//! Values are stored as JSON text per key. The recent-search list and scalar settings are layered on
//! top of [`PrefsStore`] rather than talking to a platform store directly.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{PlatformError, PlatformResult};

/// Object-safe boxed future used by [`PrefsStore`] async methods.
pub type PrefsStoreFuture<'a, T> = BoxFuture<'a, T>;

/// Host service for persisted preference values (JSON stored as text per key).
pub trait PrefsStore: Send + Sync {
    /// Loads a raw JSON string for a preference key.
    fn load_pref<'a>(&'a self, key: &'a str)
        -> PrefsStoreFuture<'a, PlatformResult<Option<String>>>;

    /// Saves a raw JSON string for a preference key.
    fn save_pref<'a>(
        &'a self,
        key: &'a str,
        raw_json: &'a str,
    ) -> PrefsStoreFuture<'a, PlatformResult<()>>;

    /// Deletes a preference key. Deleting a missing key succeeds.
    fn delete_pref<'a>(&'a self, key: &'a str) -> PrefsStoreFuture<'a, PlatformResult<()>>;
}

fn validate_key(key: &str) -> PlatformResult<()> {
    if key.is_empty() {
        Err(PlatformError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// Preference store used when the platform offers no settings service.
pub struct NoopPrefsStore;

impl PrefsStore for NoopPrefsStore {
    fn load_pref<'a>(
        &'a self,
        _key: &'a str,
    ) -> PrefsStoreFuture<'a, PlatformResult<Option<String>>> {
        Box::pin(async { Ok(None) })
    }

    fn save_pref<'a>(
        &'a self,
        _key: &'a str,
        _raw_json: &'a str,
    ) -> PrefsStoreFuture<'a, PlatformResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn delete_pref<'a>(&'a self, _key: &'a str) -> PrefsStoreFuture<'a, PlatformResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[derive(Debug, Clone, Default)]
/// In-memory preference store shared across clones.
pub struct MemoryPrefsStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryPrefsStore {
    /// Returns the stored keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = match self.inner.lock() {
            Ok(map) => map.keys().cloned().collect::<Vec<_>>(),
            Err(poisoned) => poisoned.into_inner().keys().cloned().collect(),
        };
        keys.sort();
        keys
    }

    fn with_map<T>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> T) -> PlatformResult<T> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| PlatformError::Storage("memory prefs lock poisoned".to_string()))?;
        Ok(f(&mut map))
    }
}

impl PrefsStore for MemoryPrefsStore {
    fn load_pref<'a>(
        &'a self,
        key: &'a str,
    ) -> PrefsStoreFuture<'a, PlatformResult<Option<String>>> {
        Box::pin(async move { self.with_map(|map| map.get(key).cloned()) })
    }

    fn save_pref<'a>(
        &'a self,
        key: &'a str,
        raw_json: &'a str,
    ) -> PrefsStoreFuture<'a, PlatformResult<()>> {
        Box::pin(async move {
            validate_key(key)?;
            self.with_map(|map| {
                map.insert(key.to_string(), raw_json.to_string());
            })
        })
    }

    fn delete_pref<'a>(&'a self, key: &'a str) -> PrefsStoreFuture<'a, PlatformResult<()>> {
        Box::pin(async move {
            self.with_map(|map| {
                map.remove(key);
            })
        })
    }
}

type PrefMap = BTreeMap<String, String>;

#[derive(Debug, Clone)]
/// Durable preference store backed by a single JSON map file.
///
/// Every operation re-reads the file. Clones of one handle share a write lock, so their
/// read-modify-write updates never interleave; independently opened handles over the same path do
/// not, and a concurrent update through another handle can be lost. The file is replaced by
/// rename, so readers always see a complete map.
pub struct FilePrefsStore {
    file: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FilePrefsStore {
    /// Creates a store writing `prefs.json` inside `root`, creating the directory when missing.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Storage`] when the directory cannot be created.
    pub fn from_root(root: impl AsRef<Path>) -> PlatformResult<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|err| {
            PlatformError::Storage(format!("failed to create prefs dir {}: {err}", root.display()))
        })?;
        Ok(Self {
            file: root.join("prefs.json"),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Path of the backing JSON file.
    pub fn path(&self) -> &Path {
        &self.file
    }

    fn load_map(&self) -> PlatformResult<PrefMap> {
        if !self.file.exists() {
            return Ok(PrefMap::new());
        }
        let raw = fs::read_to_string(&self.file).map_err(|err| {
            PlatformError::Storage(format!("failed to read {}: {err}", self.file.display()))
        })?;
        if raw.trim().is_empty() {
            return Ok(PrefMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn temp_path(&self) -> PathBuf {
        self.file.with_extension("json.tmp")
    }

    fn store_map(&self, map: &PrefMap) -> PlatformResult<()> {
        let serialized = serde_json::to_string(map)?;
        let temp = self.temp_path();
        let write_err = |err: std::io::Error| {
            PlatformError::Storage(format!("failed to write {}: {err}", temp.display()))
        };
        let mut file = fs::File::create(&temp).map_err(write_err)?;
        file.write_all(serialized.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);
        fs::rename(&temp, &self.file).map_err(|err| {
            PlatformError::Storage(format!("failed to replace {}: {err}", self.file.display()))
        })
    }

    fn update_map(&self, f: impl FnOnce(&mut PrefMap)) -> PlatformResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| PlatformError::Storage("file prefs lock poisoned".to_string()))?;
        let mut map = self.load_map()?;
        f(&mut map);
        self.store_map(&map)
    }
}

impl PrefsStore for FilePrefsStore {
    fn load_pref<'a>(
        &'a self,
        key: &'a str,
    ) -> PrefsStoreFuture<'a, PlatformResult<Option<String>>> {
        Box::pin(async move { Ok(self.load_map()?.get(key).cloned()) })
    }

    fn save_pref<'a>(
        &'a self,
        key: &'a str,
        raw_json: &'a str,
    ) -> PrefsStoreFuture<'a, PlatformResult<()>> {
        Box::pin(async move {
            validate_key(key)?;
            self.update_map(|map| {
                map.insert(key.to_string(), raw_json.to_string());
            })
        })
    }

    fn delete_pref<'a>(&'a self, key: &'a str) -> PrefsStoreFuture<'a, PlatformResult<()>> {
        Box::pin(async move {
            self.update_map(|map| {
                map.remove(key);
            })
        })
    }
}

/// Loads and deserializes a typed preference value through a [`PrefsStore`] implementation.
///
/// # Errors
///
/// Returns an error when the store or JSON deserialization fails.
pub async fn load_pref_with<S: PrefsStore + ?Sized, T: DeserializeOwned>(
    store: &S,
    key: &str,
) -> PlatformResult<Option<T>> {
    let Some(raw) = store.load_pref(key).await? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_str(&raw)?))
}

/// Serializes and saves a typed preference value through a [`PrefsStore`] implementation.
///
/// # Errors
///
/// Returns an error when serialization or store save fails.
pub async fn save_pref_with<S: PrefsStore + ?Sized, T: Serialize>(
    store: &S,
    key: &str,
    value: &T,
) -> PlatformResult<()> {
    let raw = serde_json::to_string(value)?;
    store.save_pref(key, &raw).await
}
