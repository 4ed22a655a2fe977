//! Ordered recent-search list persisted through a [`PrefsStore`].
//!
//! Items live under sequential integer keys starting at 0 (`"{namespace}.0"`, `"{namespace}.1"`,
//! ...). The list ends at the first missing index.

use std::sync::Arc;

use tracing::debug;

use crate::{
    error::PlatformResult,
    storage::prefs::{load_pref_with, save_pref_with, PrefsStore},
};

/// Default namespace for recent-search keys.
pub const RECENT_SEARCHES_NAMESPACE: &str = "recent_search";

#[derive(Clone)]
/// Recent-search list store layered over a shared prefs service.
pub struct RecentSearchStore {
    prefs: Arc<dyn PrefsStore>,
    namespace: String,
}

impl RecentSearchStore {
    /// Creates a store writing under [`RECENT_SEARCHES_NAMESPACE`].
    pub fn new(prefs: Arc<dyn PrefsStore>) -> Self {
        Self::with_namespace(prefs, RECENT_SEARCHES_NAMESPACE)
    }

    /// Creates a store writing under a custom namespace.
    pub fn with_namespace(prefs: Arc<dyn PrefsStore>, namespace: impl Into<String>) -> Self {
        Self {
            prefs,
            namespace: namespace.into(),
        }
    }

    /// Returns the prefs key used for the item at `index`.
    pub fn item_key(&self, index: usize) -> String {
        format!("{}.{index}", self.namespace)
    }

    /// Loads the stored searches in index order.
    ///
    /// # Errors
    ///
    /// Returns an error when the prefs store fails or an item is not a JSON string.
    pub async fn load(&self) -> PlatformResult<Vec<String>> {
        let mut items = Vec::new();
        loop {
            let key = self.item_key(items.len());
            match load_pref_with::<_, String>(self.prefs.as_ref(), &key).await? {
                Some(item) => items.push(item),
                None => break,
            }
        }
        Ok(items)
    }

    /// Overwrites indices `0..items.len()` and removes any stored index past the new end.
    ///
    /// # Errors
    ///
    /// Returns an error when any prefs write or delete fails. A failed save may leave a partially
    /// written list behind.
    pub async fn save(&self, items: &[String]) -> PlatformResult<()> {
        for (index, item) in items.iter().enumerate() {
            save_pref_with(self.prefs.as_ref(), &self.item_key(index), item).await?;
        }

        let mut index = items.len();
        loop {
            let key = self.item_key(index);
            if self.prefs.load_pref(&key).await?.is_none() {
                break;
            }
            self.prefs.delete_pref(&key).await?;
            index += 1;
        }
        if index > items.len() {
            debug!(
                namespace = %self.namespace,
                removed = index - items.len(),
                "truncated recent searches"
            );
        }
        Ok(())
    }
}
