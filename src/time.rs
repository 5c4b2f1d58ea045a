//! Clock abstraction so timestamp appension is deterministic under test.

use chrono::Utc;

/// Provides the wall-clock time used to timestamp points.
pub(crate) trait TimeProvider: std::fmt::Debug + Send + Sync + 'static {
    /// Current time as non-leap milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// [`TimeProvider`] backed by the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SystemProvider;

impl SystemProvider {
    pub(crate) fn new() -> Self {
        Self
    }
}

impl TimeProvider for SystemProvider {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A [`TimeProvider`] pinned to an instant until told otherwise.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct MockProvider {
    now: parking_lot::RwLock<i64>,
}

#[cfg(test)]
impl MockProvider {
    pub(crate) fn new(now: i64) -> Self {
        Self {
            now: parking_lot::RwLock::new(now),
        }
    }

    pub(crate) fn set(&self, now: i64) {
        *self.now.write() = now;
    }
}

#[cfg(test)]
impl TimeProvider for MockProvider {
    fn now_millis(&self) -> i64 {
        *self.now.read()
    }
}
