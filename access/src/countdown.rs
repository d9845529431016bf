//! Countdown for the displayed grant.
//!
//! The countdown holds no timer of its own. The workflow reducer schedules a
//! `Tick` every tick interval and calls [`Countdown::tick`] with the clock's
//! current time, so remaining seconds are always recomputed from wall-clock
//! time and never drift.

use crate::model::RequestId;
use chrono::{DateTime, Utc};

/// Whole seconds left until `expires_at`, never negative.
#[must_use]
pub fn remaining_seconds(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (expires_at - now).num_milliseconds();
    u64::try_from(millis.div_euclid(1_000)).unwrap_or(0)
}

/// Format seconds as `MM:SS`, or `HH:MM:SS` from one hour up.
#[must_use]
pub fn format_remaining(secs: u64) -> String {
    let hours = secs / 3_600;
    let minutes = (secs % 3_600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Result of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still running with this many seconds left
    Running(u64),
    /// Reached zero on this tick
    Expired,
    /// Expiry was already reported; nothing to do
    Finished,
}

/// Live countdown towards one request's expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    /// Request being counted down
    pub request_id: RequestId,
    /// End of the grant
    pub expires_at: DateTime<Utc>,
    /// Seconds left at the last tick
    pub remaining: u64,
    /// Ticks carrying another generation are ignored
    pub generation: u64,
    expired_reported: bool,
}

impl Countdown {
    /// Start counting down, computing the remaining time immediately.
    #[must_use]
    pub fn start(
        request_id: RequestId,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
        generation: u64,
    ) -> Self {
        Self {
            request_id,
            expires_at,
            remaining: remaining_seconds(expires_at, now),
            generation,
            expired_reported: false,
        }
    }

    /// Recompute the remaining time at `now`.
    ///
    /// Returns [`TickOutcome::Expired`] exactly once, on the first tick that
    /// sees zero. Later ticks return [`TickOutcome::Finished`].
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if self.expired_reported {
            return TickOutcome::Finished;
        }

        self.remaining = remaining_seconds(self.expires_at, now);
        if self.remaining == 0 {
            self.expired_reported = true;
            TickOutcome::Expired
        } else {
            TickOutcome::Running(self.remaining)
        }
    }

    /// Whether expiry has been reported.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.expired_reported
    }

    /// The remaining time formatted for display.
    #[must_use]
    pub fn display(&self) -> String {
        format_remaining(self.remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(1_735_689_600)
    }

    #[test]
    fn formats_like_a_clock() {
        assert_eq!(format_remaining(45), "00:45");
        assert_eq!(format_remaining(3_661), "01:01:01");
        assert_eq!(format_remaining(0), "00:00");
        assert_eq!(format_remaining(3_599), "59:59");
        assert_eq!(format_remaining(3_600), "01:00:00");
    }

    #[test]
    fn remaining_floors_and_clamps() {
        assert_eq!(remaining_seconds(t0() + Duration::milliseconds(4_999), t0()), 4);
        assert_eq!(remaining_seconds(t0() + Duration::seconds(5), t0()), 5);
        assert_eq!(remaining_seconds(t0() - Duration::seconds(30), t0()), 0);
        assert_eq!(remaining_seconds(t0() - Duration::milliseconds(1), t0()), 0);
    }

    #[test]
    fn start_computes_without_waiting() {
        let countdown = Countdown::start(RequestId::new("R1"), t0() + Duration::seconds(45), t0(), 1);
        assert_eq!(countdown.remaining, 45);
        assert_eq!(countdown.display(), "00:45");
    }

    #[test]
    fn reports_expiry_exactly_once() {
        let mut countdown = Countdown::start(RequestId::new("R1"), t0() + Duration::seconds(2), t0(), 1);

        assert_eq!(countdown.tick(t0() + Duration::seconds(1)), TickOutcome::Running(1));
        assert_eq!(countdown.tick(t0() + Duration::seconds(2)), TickOutcome::Expired);
        assert!(countdown.is_finished());
        assert_eq!(countdown.tick(t0() + Duration::seconds(3)), TickOutcome::Finished);
        assert_eq!(countdown.display(), "00:00");
    }

    #[test]
    fn late_tick_jumps_straight_to_expiry() {
        let mut countdown = Countdown::start(RequestId::new("R1"), t0() + Duration::seconds(10), t0(), 1);
        assert_eq!(countdown.tick(t0() + Duration::minutes(5)), TickOutcome::Expired);
    }

    proptest! {
        #[test]
        fn format_round_trips_to_seconds(secs in 0u64..360_000) {
            let text = format_remaining(secs);
            let parts: Vec<u64> = text.split(':').map(|p| p.parse().unwrap_or(u64::MAX)).collect();
            let total = parts.iter().fold(0u64, |acc, p| acc * 60 + p);

            prop_assert_eq!(total, secs);
            prop_assert_eq!(parts.len(), if secs >= 3_600 { 3 } else { 2 });
            prop_assert!(parts.iter().skip(1).all(|p| *p < 60));
        }

        #[test]
        fn remaining_never_increases(offsets in proptest::collection::vec(0i64..20_000, 1..20)) {
            let mut sorted = offsets;
            sorted.sort_unstable();
            let expires = t0() + Duration::seconds(10);

            let values: Vec<u64> = sorted
                .iter()
                .map(|ms| remaining_seconds(expires, t0() + Duration::milliseconds(*ms)))
                .collect();

            prop_assert!(values.windows(2).all(|w| w[0] >= w[1]));
        }
    }
}
