//! State shared by the control surface and the transmitter thread
//!
//! Everything mutable sits behind one mutex: configuration, scheduler and
//! run phase. Both sides lock it only briefly and never while rendering.

use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};

use jjywave_core::{Clock, GeneratorConfig, SchedulerEvent, TransmissionScheduler};
use tracing::{trace, warn};

use super::events::GeneratorEvent;
use super::transmitter::TransmitterHandle;
use crate::sink::AudioSink;

/// Where a run is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Phase {
    Idle,
    /// Transmitter spawned, sink not yet negotiated
    Starting,
    Running,
}

pub(super) struct Shared {
    pub config: GeneratorConfig,
    pub scheduler: TransmissionScheduler,
    pub scheduler_events: Receiver<SchedulerEvent>,
    pub phase: Phase,
    /// Bumped on every start and stop; a transmitter whose id is stale exits
    pub run_id: u64,
    pub transmitter: Option<TransmitterHandle>,
}

impl Shared {
    /// True while `run_id` is the live run and in `phase`
    pub fn is_current(&self, run_id: u64, phase: Phase) -> bool {
        self.run_id == run_id && self.phase == phase
    }

    /// Collect pending scheduler events
    pub fn drain_scheduler_events(&self) -> Vec<SchedulerEvent> {
        self.scheduler_events.try_iter().collect()
    }
}

pub(super) struct GeneratorInner {
    state: Mutex<Shared>,
    pub clock: Arc<dyn Clock>,
    pub sink: Arc<dyn AudioSink>,
    events: Sender<GeneratorEvent>,
}

impl GeneratorInner {
    pub fn new(
        shared: Shared,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn AudioSink>,
        events: Sender<GeneratorEvent>,
    ) -> Self {
        Self {
            state: Mutex::new(shared),
            clock,
            sink,
            events,
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Shared> {
        self.state.lock().unwrap_or_else(|e| {
            warn!("Generator state mutex poisoned; continuing");
            e.into_inner()
        })
    }

    pub fn emit(&self, event: GeneratorEvent) {
        if self.events.send(event).is_err() {
            trace!("Generator event receiver dropped");
        }
    }
}
