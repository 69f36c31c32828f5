//! Time sources for entity timestamps
//!
//! The registry never reads the wall clock directly. Production code uses
//! [`SystemClock`]; tests use [`ManualClock`] to get reproducible timestamps.

use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// A monotonic source of UTC timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock that never goes backwards, even if the system time does.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let next = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        *last = Some(next);
        next
    }
}

/// Deterministic clock. Every call to `now()` returns the current instant and
/// then advances by `tick`.
#[derive(Debug)]
pub struct ManualClock {
    micros: AtomicI64,
    tick_micros: i64,
}

impl ManualClock {
    /// Clock starting at `start` that advances one millisecond per reading.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::with_tick(start, Duration::milliseconds(1))
    }

    /// Clock that returns `start` forever until advanced explicitly.
    pub fn frozen(start: DateTime<Utc>) -> Self {
        Self::with_tick(start, Duration::zero())
    }

    pub fn with_tick(start: DateTime<Utc>, tick: Duration) -> Self {
        Self {
            micros: AtomicI64::new(start.timestamp_micros()),
            tick_micros: tick.num_microseconds().unwrap_or(0).max(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        let step = by.num_microseconds().unwrap_or(0).max(0);
        self.micros.fetch_add(step, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        from_micros(self.micros.fetch_add(self.tick_micros, Ordering::SeqCst))
    }
}

fn from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_micros(micros).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn manual_clock_ticks_per_reading() {
        let clock = ManualClock::new(epoch());
        let a = clock.now();
        let b = clock.now();
        assert_eq!(a, epoch());
        assert_eq!(b - a, Duration::milliseconds(1));
    }

    #[test]
    fn frozen_clock_only_moves_when_advanced() {
        let clock = ManualClock::frozen(epoch());
        assert_eq!(clock.now(), clock.now());
        clock.advance(Duration::seconds(5));
        assert_eq!(clock.now(), epoch() + Duration::seconds(5));
    }

    #[test]
    fn system_clock_is_non_decreasing() {
        let clock = SystemClock::new();
        let mut prev = clock.now();
        for _ in 0..100 {
            let next = clock.now();
            assert!(next >= prev);
            prev = next;
        }
    }
}
