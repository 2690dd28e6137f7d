//! Time sources
//!
//! The scheduler needs two views of time: the civil wall clock (what to
//! encode) and a monotonic hardware tick counter (when to play it). Both come
//! from a [`Clock`] so tests can substitute a deterministic [`ManualClock`].

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};

/// Source of wall-clock time and hardware ticks
pub trait Clock: Send + Sync {
    /// Current wall-clock instant
    fn now(&self) -> DateTime<Utc>;

    /// Monotonic hardware tick counter
    fn hardware_ticks(&self) -> u64;

    /// Ticks per second of [`Clock::hardware_ticks`]
    fn tick_frequency(&self) -> f64;
}

/// Host clock: `chrono::Utc` for wall time, `std::time::Instant` nanoseconds for ticks
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn hardware_ticks(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn tick_frequency(&self) -> f64 {
        1_000_000_000.0
    }
}

#[derive(Debug, Clone, Copy)]
struct ManualState {
    now: DateTime<Utc>,
    ticks: u64,
}

/// Deterministic clock for tests and offline rendering
///
/// Wall time and ticks only move when told to. [`ManualClock::advance`] moves
/// both together; [`ManualClock::set_now`] jumps the wall clock alone, which
/// is how a host clock step looks to the scheduler.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<ManualState>,
    tick_frequency: f64,
}

impl ManualClock {
    /// Create a clock reading `start` with the tick counter at zero
    pub fn new(start: DateTime<Utc>, tick_frequency: f64) -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: start,
                ticks: 0,
            }),
            tick_frequency,
        }
    }

    /// Nanosecond ticks, matching [`SystemClock`]
    pub fn with_nanosecond_ticks(start: DateTime<Utc>) -> Self {
        Self::new(start, 1_000_000_000.0)
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|e| {
            tracing::warn!("Manual clock mutex poisoned; continuing");
            e.into_inner()
        })
    }

    /// Advance wall time and ticks by the same amount
    pub fn advance(&self, by: Duration) {
        let mut state = self.lock();
        if let Some(now) = TimeDelta::from_std(by)
            .ok()
            .and_then(|delta| state.now.checked_add_signed(delta))
        {
            state.now = now;
        }
        let ticks = (by.as_secs_f64() * self.tick_frequency).round() as u64;
        state.ticks = state.ticks.saturating_add(ticks);
    }

    /// Jump the wall clock without touching the tick counter
    pub fn set_now(&self, now: DateTime<Utc>) {
        self.lock().now = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.lock().now
    }

    fn hardware_ticks(&self) -> u64 {
        self.lock().ticks
    }

    fn tick_frequency(&self) -> f64 {
        self.tick_frequency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_system_clock_ticks_are_monotonic() {
        let clock = SystemClock::new();
        let a = clock.hardware_ticks();
        let b = clock.hardware_ticks();
        assert!(b >= a);
        assert_eq!(clock.tick_frequency(), 1e9);
    }

    #[test]
    fn test_manual_clock_advance_moves_both() {
        let start = Utc.with_ymd_and_hms(2025, 1, 15, 5, 30, 0).unwrap();
        let clock = ManualClock::with_nanosecond_ticks(start);
        clock.advance(Duration::from_millis(1500));

        assert_eq!(clock.hardware_ticks(), 1_500_000_000);
        assert_eq!(clock.now(), start + TimeDelta::milliseconds(1500));
    }

    #[test]
    fn test_manual_clock_set_now_leaves_ticks() {
        let start = Utc.with_ymd_and_hms(2025, 1, 15, 5, 30, 0).unwrap();
        let clock = ManualClock::new(start, 48_000.0);
        clock.advance(Duration::from_secs(1));
        clock.set_now(start + TimeDelta::seconds(10));

        assert_eq!(clock.hardware_ticks(), 48_000);
        assert_eq!(clock.now(), start + TimeDelta::seconds(10));
    }
}
