//! Scalar user settings read through a [`PrefsStore`].

use std::sync::Arc;

use tracing::warn;

use crate::{
    error::PlatformResult,
    storage::prefs::{load_pref_with, save_pref_with, PrefsStore},
};

/// Prefs key of the user-configurable recent song count.
pub const RECENT_SONG_COUNT_KEY: &str = "recent_song_count";
/// Recent song count used when the user never configured one.
pub const DEFAULT_RECENT_SONG_COUNT: i64 = 150;

#[derive(Clone)]
/// Integer settings with caller-supplied defaults.
pub struct ScalarSettings {
    prefs: Arc<dyn PrefsStore>,
    recent_song_count_default: i64,
}

impl ScalarSettings {
    /// Creates settings using [`DEFAULT_RECENT_SONG_COUNT`].
    pub fn new(prefs: Arc<dyn PrefsStore>) -> Self {
        Self {
            prefs,
            recent_song_count_default: DEFAULT_RECENT_SONG_COUNT,
        }
    }

    /// Overrides the fallback used by [`Self::recent_song_count`].
    pub fn with_recent_song_count_default(mut self, default: i64) -> Self {
        self.recent_song_count_default = default;
        self
    }

    /// Returns the integer stored under `key`, or `default` when it is missing or unreadable.
    pub async fn get_int(&self, key: &str, default: i64) -> i64 {
        match load_pref_with::<_, i64>(self.prefs.as_ref(), key).await {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(err) => {
                warn!(key, %err, "falling back to default for unreadable setting");
                default
            }
        }
    }

    /// Stores an integer under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when the prefs store rejects the write.
    pub async fn set_int(&self, key: &str, value: i64) -> PlatformResult<()> {
        save_pref_with(self.prefs.as_ref(), key, &value).await
    }

    /// Number of recently played songs to request.
    pub async fn recent_song_count(&self) -> i64 {
        self.get_int(RECENT_SONG_COUNT_KEY, self.recent_song_count_default)
            .await
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::storage::prefs::{MemoryPrefsStore, NoopPrefsStore};

    #[test]
    fn recent_song_count_defaults_to_150() {
        let settings = ScalarSettings::new(Arc::new(NoopPrefsStore));
        assert_eq!(block_on(settings.recent_song_count()), 150);
    }

    #[test]
    fn stored_value_wins_over_default() {
        let settings = ScalarSettings::new(Arc::new(MemoryPrefsStore::default()));
        block_on(settings.set_int(RECENT_SONG_COUNT_KEY, 40)).expect("set");
        assert_eq!(block_on(settings.recent_song_count()), 40);
        assert_eq!(block_on(settings.get_int(RECENT_SONG_COUNT_KEY, 7)), 40);
    }

    #[test]
    fn malformed_value_falls_back_to_default() {
        let prefs = MemoryPrefsStore::default();
        block_on(prefs.save_pref(RECENT_SONG_COUNT_KEY, "\"lots\"")).expect("seed");
        let settings = ScalarSettings::new(Arc::new(prefs)).with_recent_song_count_default(25);
        assert_eq!(block_on(settings.recent_song_count()), 25);
    }
}
