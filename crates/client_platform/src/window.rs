//! Window/screen metrics queries.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

/// Handle of a host window whose metrics are queried.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostWindow(String);

impl HostWindow {
    /// Creates a host window handle from its platform identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the platform identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Axis selector for [`dimension`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// Horizontal extent.
    Width,
    /// Vertical extent.
    Height,
}

/// Window size in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowSize {
    /// Horizontal extent.
    pub width: u32,
    /// Vertical extent.
    pub height: u32,
}

/// Host service exposing window metrics.
pub trait WindowMetricsProvider: Send + Sync {
    /// Returns the window size, or `None` when the host cannot report it.
    fn window_size(&self, host: &HostWindow) -> Option<WindowSize>;
}

/// Reads one axis of a window's size, returning 0 on any failure.
pub fn dimension(provider: &dyn WindowMetricsProvider, host: &HostWindow, axis: Dimension) -> u32 {
    provider
        .window_size(host)
        .map_or(0, |size| match axis {
            Dimension::Width => size.width,
            Dimension::Height => size.height,
        })
}

#[derive(Debug, Clone, Copy, Default)]
/// Metrics provider for headless hosts.
pub struct NoopWindowMetrics;

impl WindowMetricsProvider for NoopWindowMetrics {
    fn window_size(&self, _host: &HostWindow) -> Option<WindowSize> {
        None
    }
}

#[derive(Debug, Clone, Default)]
/// In-memory window table updated by the host on resize.
pub struct MemoryWindowMetrics {
    sizes: Arc<RwLock<HashMap<HostWindow, WindowSize>>>,
}

impl MemoryWindowMetrics {
    /// Records the current size of a window.
    pub fn set_size(&self, host: HostWindow, size: WindowSize) {
        let mut sizes = match self.sizes.write() {
            Ok(sizes) => sizes,
            Err(poisoned) => poisoned.into_inner(),
        };
        sizes.insert(host, size);
    }
}

impl WindowMetricsProvider for MemoryWindowMetrics {
    fn window_size(&self, host: &HostWindow) -> Option<WindowSize> {
        self.sizes.read().ok()?.get(host).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_each_axis() {
        let metrics = MemoryWindowMetrics::default();
        let main = HostWindow::new("main");
        metrics.set_size(
            main.clone(),
            WindowSize {
                width: 1080,
                height: 2340,
            },
        );
        assert_eq!(dimension(&metrics, &main, Dimension::Width), 1080);
        assert_eq!(dimension(&metrics, &main, Dimension::Height), 2340);
    }

    #[test]
    fn unknown_window_or_missing_service_is_zero() {
        let metrics = MemoryWindowMetrics::default();
        let ghost = HostWindow::new("ghost");
        assert_eq!(dimension(&metrics, &ghost, Dimension::Width), 0);
        assert_eq!(dimension(&NoopWindowMetrics, &ghost, Dimension::Height), 0);
    }
}
