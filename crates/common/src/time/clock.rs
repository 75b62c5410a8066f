//! Wall-clock abstraction for deterministic tests
//!
//! Services that compare timestamps (token expiry, overdue status, mapping
//! timestamps) take an `Arc<dyn Clock>` instead of calling `Utc::now()`
//! directly, so tests can pin or advance time.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync + 'static {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Real system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually controlled clock
///
/// Clones share the same underlying instant.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<RwLock<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a mock clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { current: Arc::new(RwLock::new(start)) }
    }

    /// Create a mock clock frozen at the current system time.
    pub fn at_now() -> Self {
        Self::new(Utc::now())
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.write();
        *current += by;
    }

    /// Jump to an absolute instant.
    pub fn set(&self, at: DateTime<Utc>) {
        *self.current.write() = at;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::at_now()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.read()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn mock_clock_is_frozen_until_advanced() {
        let start = Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap();
        let clock = MockClock::new(start);

        assert_eq!(clock.now(), start);
        clock.advance(Duration::minutes(90));
        assert_eq!(clock.now(), start + Duration::minutes(90));
    }

    #[test]
    fn clones_share_time() {
        let clock = MockClock::at_now();
        let other = clock.clone();
        let target = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

        other.set(target);
        assert_eq!(clock.now(), target);
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
