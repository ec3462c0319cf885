//! Time abstraction for testability
//!
//! Retry envelopes carry absolute wall-clock deadlines that must survive a
//! process restart, so the clock hands out `DateTime<Utc>` rather than a
//! monotonic `Instant`.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use delayq_common::time::{Clock, MockClock};
//!
//! let clock = MockClock::new();
//! let start = clock.now();
//!
//! // Simulate 5 seconds passing
//! clock.advance(Duration::from_secs(5));
//!
//! assert_eq!((clock.now() - start).num_seconds(), 5);
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Source of the current wall-clock instant.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Real system clock. Use this in production code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Mock clock for deterministic testing
///
/// Time only moves when [`MockClock::advance`] or [`MockClock::set`] is
/// called. Clones share the same instant, so a clone handed to a queue
/// simulator and the one held by a test observe the same time.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: DateTime<Utc>,
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a mock clock frozen at the current real time.
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Create a mock clock frozen at `instant`.
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self { start: instant, current: Arc::new(Mutex::new(instant)) }
    }

    /// Simulate `duration` passing without actually waiting.
    ///
    /// Durations beyond chrono's representable range saturate the clock at
    /// its current value.
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock();
        if let Some(next) = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|delta| current.checked_add_signed(delta))
        {
            *current = next;
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current.lock() = instant;
    }

    /// Simulated time elapsed since the clock was created.
    ///
    /// Returns zero if the clock was set backwards past its start.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        (*self.current.lock() - self.start).to_std().unwrap_or_default()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}
