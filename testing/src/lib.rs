//! # FleetDesk Testing
//!
//! Testing utilities for reducers built on `fleetdesk-core`.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - A Given-When-Then harness for reducers ([`ReducerTest`])
//! - Assertion helpers for returned effects
//!
//! ## Example
//!
//! ```ignore
//! use fleetdesk_testing::{ManualClock, test_clock};
//!
//! let clock = ManualClock::starting_at(test_clock().now());
//! let env = WorkflowEnvironment::new(mock_client, clock.clone(), Some(session));
//!
//! clock.advance(chrono::Duration::seconds(5));
//! let effects = reducer.reduce(&mut state, WorkflowAction::Tick { generation: 1 }, &env);
//! ```

use chrono::{DateTime, Utc};
use fleetdesk_core::environment::Clock;


pub use reducer_test::{ReducerTest, assertions};

/// Deterministic clock implementations
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use fleetdesk_testing::mocks::FixedClock;
    /// use fleetdesk_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to
    ///
    /// Clones share the same time, so a test can keep one handle and give the
    /// other to an environment.
    ///
    /// # Example
    ///
    /// ```
    /// use fleetdesk_testing::mocks::ManualClock;
    /// use fleetdesk_core::environment::Clock;
    ///
    /// let clock = ManualClock::starting_at(fleetdesk_testing::test_clock().now());
    /// let start = clock.now();
    /// clock.advance(chrono::Duration::seconds(3));
    /// assert_eq!(clock.now() - start, chrono::Duration::seconds(3));
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a manual clock at `time`
        #[must_use]
        pub fn starting_at(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move time forward (or backward, with a negative duration)
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute time
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::seconds(1_735_689_600))
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::starting_at(test_clock().now());
        let handle = clock.clone();

        handle.advance(chrono::Duration::milliseconds(1500));

        assert_eq!(
            clock.now() - test_clock().now(),
            chrono::Duration::milliseconds(1500)
        );
    }

    #[test]
    fn manual_clock_set_jumps() {
        let clock = ManualClock::starting_at(test_clock().now());
        let later = test_clock().now() + chrono::Duration::hours(2);

        clock.set(later);

        assert_eq!(clock.now(), later);
    }
}
