//! Scheduling counters for one run

use std::sync::Arc;
use std::time::Duration;

use crate::timecode::{Frame, Symbol};

/// Drift thresholds and timer placement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerTolerances {
    /// Resync when the timer fires this long after the scheduled second
    pub late: Duration,
    /// Resync when the scheduled second is closer than this
    pub min_lead: Duration,
    /// How far ahead of each second the timer aims to fire
    pub lead_target: Duration,
    /// Slack allowed to the repeating timer
    pub timer_leeway: Duration,
}

impl Default for SchedulerTolerances {
    fn default() -> Self {
        Self {
            late: Duration::from_millis(200),
            min_lead: Duration::from_millis(20),
            lead_target: Duration::from_millis(500),
            timer_leeway: Duration::from_millis(5),
        }
    }
}

/// Convert a duration to whole hardware ticks
pub(crate) fn to_ticks(duration: Duration, tick_frequency: f64) -> u64 {
    (duration.as_secs_f64() * tick_frequency).round() as u64
}

/// What is being transmitted and when the next second sounds
///
/// Exists only while the scheduler is running.
#[derive(Debug, Clone)]
pub struct SchedulerState {
    pub(crate) frame: Arc<Frame>,
    pub(crate) index: usize,
    pub(crate) next_tick: u64,
    pub(crate) tick_frequency: f64,
    pub(crate) ticks_per_second: u64,
}

impl SchedulerState {
    /// The active frame
    pub fn frame(&self) -> &Arc<Frame> {
        &self.frame
    }

    /// Index of the next second to be scheduled
    pub fn index(&self) -> usize {
        self.index
    }

    /// Hardware tick at which that second starts
    pub fn next_tick(&self) -> u64 {
        self.next_tick
    }

    pub fn tick_frequency(&self) -> f64 {
        self.tick_frequency
    }

    pub fn ticks_per_second(&self) -> u64 {
        self.ticks_per_second
    }

    /// Symbol at the current index
    pub(crate) fn current_symbol(&self) -> Symbol {
        // index is always kept below the frame length
        self.frame.get(self.index).unwrap_or(Symbol::Mark)
    }

    /// Move to the following second
    pub(crate) fn advance(&mut self) {
        self.index = (self.index + 1) % self.frame.len().max(1);
        self.next_tick = self.next_tick.saturating_add(self.ticks_per_second);
    }
}

/// Running totals since the last start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub resyncs: u64,
    pub frames_built: u64,
    pub seconds_scheduled: u64,
}
