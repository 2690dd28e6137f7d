//! Mapping frame seconds onto hardware time
//!
//! The scheduler decides which symbol sounds at which hardware tick. It is
//! driven from outside: [`TransmissionScheduler::start`] once, then
//! [`TransmissionScheduler::on_timer`] from a repeating one-second timer that
//! fires around [`TransmissionScheduler::next_wakeup_tick`]. Everything it
//! decides is reported as [`SchedulerEvent`]s on a channel.
//!
//! Two checks run on every timer tick. If the timer fired more than
//! `late` after the scheduled second, or the scheduled second is less than
//! `min_lead` away, the next boundary and frame index are recomputed from
//! the wall clock (a resync). Frames are rebuilt exactly once per minute
//! boundary, either by the resync or by the ordinary rollover to index 0.

mod state;


use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use chrono::{DateTime, FixedOffset, TimeDelta, Timelike, Utc};
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::config::EncodingOptions;
use crate::timecode::{Frame, FrameBuilder, Symbol, jst_minute_start};

pub use state::{SchedulerState, SchedulerStats, SchedulerTolerances};
use state::to_ticks;

/// Errors starting the scheduler
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchedulerError {
    /// The clock's tick frequency cannot be used for scheduling
    #[error("unusable hardware tick frequency: {0}")]
    InvalidTickFrequency(f64),
}

/// What the scheduler decided
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    /// A new frame became active
    FrameRebuilt {
        /// JST start of the encoded minute
        minute: DateTime<FixedOffset>,
        /// Seconds in the frame
        length: usize,
    },
    /// `symbol` must start sounding at `hardware_tick`
    SecondReady {
        symbol: Symbol,
        index: usize,
        hardware_tick: u64,
    },
}

/// Why a resync happened
#[derive(Debug, Clone, Copy)]
enum Drift {
    Late,
    InsufficientLead,
}

/// Owns the active frame and the second-by-second schedule
#[derive(Debug)]
pub struct TransmissionScheduler {
    builder: FrameBuilder,
    tolerances: SchedulerTolerances,
    state: Option<SchedulerState>,
    stats: SchedulerStats,
    events: Sender<SchedulerEvent>,
}

impl TransmissionScheduler {
    /// Create an idle scheduler and the receiving end of its event channel
    pub fn new(tolerances: SchedulerTolerances) -> (Self, Receiver<SchedulerEvent>) {
        let (events, rx) = mpsc::channel();
        let scheduler = Self {
            builder: FrameBuilder::new(),
            tolerances,
            state: None,
            stats: SchedulerStats::default(),
            events,
        };
        (scheduler, rx)
    }

    pub fn tolerances(&self) -> SchedulerTolerances {
        self.tolerances
    }

    pub fn set_tolerances(&mut self, tolerances: SchedulerTolerances) {
        self.tolerances = tolerances;
    }

    pub fn is_running(&self) -> bool {
        self.state.is_some()
    }

    /// Scheduling state, `None` while idle
    pub fn state(&self) -> Option<&SchedulerState> {
        self.state.as_ref()
    }

    /// The active frame, `None` while idle
    pub fn current_frame(&self) -> Option<Arc<Frame>> {
        self.state.as_ref().map(|s| Arc::clone(&s.frame))
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Hardware tick at which the timer should next fire
    pub fn next_wakeup_tick(&self) -> Option<u64> {
        self.state.as_ref().map(|s| {
            s.next_tick
                .saturating_sub(to_ticks(self.tolerances.lead_target, s.tick_frequency))
        })
    }

    /// Begin a run and schedule its first second
    ///
    /// A running scheduler is reset first.
    pub fn start(
        &mut self,
        clock: &dyn Clock,
        options: &EncodingOptions,
    ) -> Result<(), SchedulerError> {
        let tick_frequency = clock.tick_frequency();
        let ticks_per_second = tick_frequency.round();
        if !tick_frequency.is_finite() || ticks_per_second < 1.0 {
            return Err(SchedulerError::InvalidTickFrequency(tick_frequency));
        }
        self.stop();

        let now = clock.now();
        let hardware_now = clock.hardware_ticks();

        let mut frame = self.builder.build(now, options);
        let index = next_index(now, frame.len());
        if index == 0 {
            frame = self.builder.build(next_minute(frame.minute(), now), options);
        }

        self.stats.frames_built += 1;
        self.announce(&frame);
        self.state = Some(SchedulerState {
            frame: Arc::new(frame),
            index,
            next_tick: next_boundary(now, hardware_now, tick_frequency),
            tick_frequency,
            ticks_per_second: ticks_per_second as u64,
        });
        debug!(index, tick_frequency, "Transmission scheduler started");
        self.emit_second();
        Ok(())
    }

    /// Handle one firing of the repeating timer
    ///
    /// Does nothing while idle.
    pub fn on_timer(&mut self, clock: &dyn Clock, options: &EncodingOptions) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        let hardware_now = clock.hardware_ticks();
        let frequency = state.tick_frequency;
        let late_ticks = to_ticks(self.tolerances.late, frequency);
        let lead_ticks = to_ticks(self.tolerances.min_lead, frequency);

        let drift = if hardware_now > state.next_tick.saturating_add(late_ticks) {
            Some(Drift::Late)
        } else if state.next_tick <= hardware_now.saturating_add(lead_ticks) {
            Some(Drift::InsufficientLead)
        } else {
            None
        };

        match drift {
            Some(drift) => self.resync(clock, options, hardware_now, drift),
            None if state.index == 0 => {
                let upcoming = next_minute(state.frame.minute(), clock.now());
                let frame = self.builder.build(upcoming, options);
                self.replace_frame(frame);
            }
            None => {}
        }

        self.emit_second();
    }

    /// Discard the frame and every counter
    pub fn stop(&mut self) {
        if self.state.take().is_some() {
            debug!(
                resyncs = self.stats.resyncs,
                seconds = self.stats.seconds_scheduled,
                "Transmission scheduler stopped"
            );
        }
        self.stats = SchedulerStats::default();
    }

    fn resync(
        &mut self,
        clock: &dyn Clock,
        options: &EncodingOptions,
        hardware_now: u64,
        drift: Drift,
    ) {
        let now = clock.now();
        let Some(state) = self.state.as_mut() else {
            return;
        };

        let lateness_ms =
            (hardware_now as f64 - state.next_tick as f64) / state.tick_frequency * 1000.0;
        debug!(?drift, lateness_ms, "Resynchronizing to wall clock");

        state.next_tick = next_boundary(now, hardware_now, state.tick_frequency);

        let minute = jst_minute_start(now);
        let same_minute = state.frame.minute() == minute;
        let current = if same_minute {
            None
        } else {
            Some(self.builder.build(now, options))
        };
        let length = current.as_ref().map_or(state.frame.len(), Frame::len);
        let index = next_index(now, length);
        state.index = index;

        let replacement = if index == 0 {
            Some(self.builder.build(next_minute(minute, now), options))
        } else {
            current
        };
        self.stats.resyncs += 1;
        if let Some(frame) = replacement {
            self.replace_frame(frame);
        }
    }

    fn replace_frame(&mut self, frame: Frame) {
        self.stats.frames_built += 1;
        self.announce(&frame);
        if let Some(state) = self.state.as_mut() {
            if state.index >= frame.len() {
                state.index = 0;
            }
            state.frame = Arc::new(frame);
        }
    }

    fn announce(&self, frame: &Frame) {
        debug!(minute = %frame.minute(), length = frame.len(), "Frame rebuilt");
        self.send(SchedulerEvent::FrameRebuilt {
            minute: frame.minute(),
            length: frame.len(),
        });
    }

    /// Report the current second and move past it
    fn emit_second(&mut self) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let event = SchedulerEvent::SecondReady {
            symbol: state.current_symbol(),
            index: state.index,
            hardware_tick: state.next_tick,
        };
        state.advance();
        self.stats.seconds_scheduled += 1;
        self.send(event);
    }

    fn send(&self, event: SchedulerEvent) {
        if self.events.send(event).is_err() {
            trace!("Scheduler event receiver dropped");
        }
    }
}

/// `(second + 1) mod length`: by the time audio is heard the clock has moved on
fn next_index(now: DateTime<Utc>, length: usize) -> usize {
    (now.second() as usize + 1) % length.max(1)
}

/// Hardware tick of the next whole wall-clock second
fn next_boundary(now: DateTime<Utc>, hardware_now: u64, tick_frequency: f64) -> u64 {
    let fraction = (f64::from(now.nanosecond()) / 1e9).min(1.0);
    let ahead = ((1.0 - fraction) * tick_frequency).round().max(1.0) as u64;
    hardware_now.saturating_add(ahead)
}

/// An instant inside the minute after `minute`
fn next_minute(minute: DateTime<FixedOffset>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    minute
        .checked_add_signed(TimeDelta::minutes(1))
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(fallback)
}
