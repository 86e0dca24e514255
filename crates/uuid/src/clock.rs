//! Timestamp sources for record stamping.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Mutex;

/// Source of record timestamps.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the timestamp to stamp the next record with.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock that never goes backwards and never repeats.
///
/// If the system clock returns a value at or before the previous timestamp, the previous
/// timestamp plus one millisecond is returned instead.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();

        let stamped = match *last {
            Some(prev) if now <= prev => prev + Duration::milliseconds(1),
            _ => now,
        };

        *last = Some(stamped);
        stamped
    }
}

/// Deterministic clock for tests and replays.
///
/// Each call to [`Clock::now`] returns the current instant and then advances it by `step`.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl ManualClock {
    pub fn starting_at(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            current: Mutex::new(start),
            step,
        }
    }

    /// Moves the clock to `instant`; the next `now()` returns exactly this value.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let stamped = *current;
        *current = stamped + self.step;
        stamped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn monotonic_clock_is_strictly_increasing() {
        let clock = MonotonicClock::new();
        let mut previous = clock.now();
        for _ in 0..1_000 {
            let next = clock.now();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn manual_clock_advances_by_step() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let clock = ManualClock::starting_at(start, Duration::minutes(5));

        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start + Duration::minutes(5));

        let jump = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        clock.set(jump);
        assert_eq!(clock.now(), jump);
    }
}
