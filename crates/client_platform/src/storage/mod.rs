//! Persisted settings: raw prefs, the recent-search list, and scalar settings.

pub mod prefs;
pub mod recent_searches;
pub mod settings;
