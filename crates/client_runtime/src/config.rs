//! Typed client configuration and its TOML loader.

use std::{
    fs,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use client_notify::DeliveryMode;
use client_platform::{DEFAULT_RECENT_SONG_COUNT, RECENT_SEARCHES_NAMESPACE};
use serde::{de::DeserializeOwned, Deserialize};

use crate::error::{RuntimeError, RuntimeResult};

/// Notification delivery settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotificationConfig {
    /// How the consumer receives envelopes.
    pub delivery_mode: DeliveryMode,
    /// Name of the consumer, used for its thread name and in logs.
    pub consumer_name: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            delivery_mode: DeliveryMode::Queued,
            consumer_name: "ui".to_string(),
        }
    }
}

/// Persisted settings layout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsConfig {
    /// Prefs namespace holding the recent-search list.
    pub recent_searches_namespace: String,
    /// Recent song count used until the user picks one.
    pub recent_song_count_default: i64,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            recent_searches_namespace: RECENT_SEARCHES_NAMESPACE.to_string(),
            recent_song_count_default: DEFAULT_RECENT_SONG_COUNT,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter directive; `RUST_LOG` takes precedence when set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Complete client configuration. Every section and field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Notification delivery settings.
    pub notifications: NotificationConfig,
    /// Persisted settings layout.
    pub settings: SettingsConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Config`] when the text is not valid TOML for this schema.
    pub fn from_toml_str(body: &str) -> RuntimeResult<Self> {
        toml::from_str(body).map_err(|err| RuntimeError::config(err.to_string()))
    }
}

/// Generic TOML-backed config loader.
///
/// Handles only filesystem access and deserialization; callers validate semantics afterwards.
#[derive(Clone, Debug)]
pub struct ConfigLoader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T> ConfigLoader<T>
where
    T: DeserializeOwned,
{
    /// Creates a loader for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    /// Reads and deserializes the file.
    ///
    /// # Errors
    ///
    /// Missing files, unreadable files, and parse failures are all [`RuntimeError::Config`].
    pub fn load(&self) -> RuntimeResult<T> {
        let body = fs::read_to_string(&self.path).map_err(|err| RuntimeError::Config {
            path: Some(self.path.clone()),
            message: format!("failed to read: {err}"),
        })?;
        toml::from_str(&body).map_err(|err| RuntimeError::Config {
            path: Some(self.path.clone()),
            message: format!("failed to parse: {err}"),
        })
    }

    /// Returns the config path on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use pretty_assertions::assert_eq;

    use super::*;

    fn unique_test_root() -> PathBuf {
        std::env::temp_dir().join(format!(
            "client-config-test-{}-{}",
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("time")
                .as_nanos()
        ))
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = ClientConfig::from_toml_str("").expect("parse empty");
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.notifications.delivery_mode, DeliveryMode::Queued);
        assert_eq!(config.settings.recent_song_count_default, 150);
        assert_eq!(config.settings.recent_searches_namespace, "recent_search");
    }

    #[test]
    fn sections_override_defaults() {
        let config = ClientConfig::from_toml_str(
            "[notifications]\ndelivery_mode = \"immediate\"\n\n[settings]\nrecent_song_count_default = 40\n",
        )
        .expect("parse");
        assert_eq!(config.notifications.delivery_mode, DeliveryMode::Immediate);
        assert_eq!(config.notifications.consumer_name, "ui");
        assert_eq!(config.settings.recent_song_count_default, 40);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn unknown_fields_are_config_errors() {
        let err = ClientConfig::from_toml_str("[notifications]\nretries = 3\n")
            .expect_err("unknown field");
        assert!(matches!(err, RuntimeError::Config { path: None, .. }));
        assert!(err.to_string().contains("retries"));
    }

    #[test]
    fn loader_reads_file_and_reports_missing_path() {
        let root = unique_test_root();
        fs::create_dir_all(&root).expect("create temp root");
        fs::write(root.join("client.toml"), "[logging]\nfilter = \"debug\"\n")
            .expect("write config");

        let loaded = ConfigLoader::<ClientConfig>::new(root.join("client.toml"))
            .load()
            .expect("load config");
        assert_eq!(loaded.logging.filter, "debug");

        let err = ConfigLoader::<ClientConfig>::new(root.join("missing.toml"))
            .load()
            .expect_err("missing config should fail");
        assert!(err.to_string().contains("missing.toml"));

        let _ = fs::remove_dir_all(root);
    }
}
