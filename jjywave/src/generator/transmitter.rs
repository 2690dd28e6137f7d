//! Transmitter thread
//!
//! One thread per run. It negotiates the sink, starts the scheduler, then
//! sleeps until each wake-up tick and lets the scheduler decide the next
//! second. Rendering happens outside the lock; the hand-off to the sink
//! does not.

use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use jjywave_core::{
    PhaseAccumulator, SampleFormat, SchedulerEvent, SecondParams, WaveformSynthesizer,
};
use tracing::{debug, error, warn};

use super::events::GeneratorEvent;
use super::metrics::TransmitMetrics;
use super::state::{GeneratorInner, Phase, Shared};

/// Longest single sleep; the clock is re-read after each one
const MAX_WAIT: Duration = Duration::from_millis(100);

/// Handle to a transmitter thread
pub(super) struct TransmitterHandle {
    /// Dropping the sender wakes the thread and ends the run
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl TransmitterHandle {
    /// Signal the thread to exit without waiting for it
    pub fn cancel(mut self) {
        drop(self.stop_tx.take());
        drop(self.thread.take());
    }
}

impl Drop for TransmitterHandle {
    fn drop(&mut self) {
        // Signal before joining, or the thread never wakes
        drop(self.stop_tx.take());
        if let Some(handle) = self.thread.take() {
            // The last owner of the shared state may be the thread itself
            if handle.thread().id() == thread::current().id() {
                return;
            }
            let _ = handle.join();
        }
    }
}

/// A second the scheduler asked for, with what is needed to render it
struct PendingSecond {
    event: SchedulerEvent,
    params: SecondParams,
}

pub(super) struct Transmitter {
    inner: Arc<GeneratorInner>,
    run_id: u64,
    stop_rx: mpsc::Receiver<()>,
    synth: WaveformSynthesizer,
    phase: PhaseAccumulator,
    format: SampleFormat,
    metrics: TransmitMetrics,
}

impl Transmitter {
    pub fn spawn(inner: Arc<GeneratorInner>, run_id: u64) -> io::Result<TransmitterHandle> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("jjy-transmit".into())
            .spawn(move || {
                let mut transmitter = Self {
                    inner,
                    run_id,
                    stop_rx,
                    synth: WaveformSynthesizer::new(),
                    phase: PhaseAccumulator::new(),
                    format: SampleFormat::new(0.0, 0),
                    metrics: TransmitMetrics::new(),
                };
                transmitter.run();
            })?;
        Ok(TransmitterHandle {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    fn run(&mut self) {
        debug!(run = self.run_id, "Transmitter thread started");
        if let Some(first) = self.begin() {
            self.render_all(first);
            self.transmit();
        }
        self.metrics.log();
        debug!(run = self.run_id, "Transmitter thread finished");
    }

    /// Negotiate the sink and start the scheduler
    ///
    /// Returns the first seconds to render, or `None` if the run ended.
    fn begin(&mut self) -> Option<Vec<PendingSecond>> {
        let carrier = {
            let shared = self.inner.lock();
            if !shared.is_current(self.run_id, Phase::Starting) {
                return None;
            }
            shared.config.carrier.clone()
        };

        // Device start-up can be slow; hold no lock across it
        let negotiated = self
            .inner
            .sink
            .negotiate(carrier.sample_rate, carrier.channel_count);

        let mut shared = self.inner.lock();
        if !shared.is_current(self.run_id, Phase::Starting) {
            debug!(run = self.run_id, "Start cancelled before transmission began");
            return None;
        }
        if let Err(e) = negotiated {
            error!("Audio sink negotiation failed: {}", e);
            self.fail(&mut shared, e.to_string());
            return None;
        }

        let format = self.inner.sink.current_format();
        self.format = match format {
            Some(f) => SampleFormat::new(f.sample_rate, f.channels),
            None => SampleFormat::new(carrier.sample_rate, carrier.channel_count),
        };

        let encoding = shared.config.encoding.clone();
        if let Err(e) = shared.scheduler.start(&*self.inner.clock, &encoding) {
            error!("Transmission scheduler failed to start: {}", e);
            self.fail(&mut shared, e.to_string());
            return None;
        }
        shared.phase = Phase::Running;
        self.inner.emit(GeneratorEvent::Started);
        Some(self.collect(&shared))
    }

    /// End this run from inside the thread
    ///
    /// The run's own handle is detached here; `stop` finds the phase idle
    /// and never takes it.
    fn fail(&self, shared: &mut Shared, message: String) {
        shared.phase = Phase::Idle;
        shared.scheduler.stop();
        let _ = shared.drain_scheduler_events();
        if let Some(handle) = shared.transmitter.take() {
            handle.cancel();
        }
        self.inner.emit(GeneratorEvent::Error(message));
    }

    /// Timer loop, until stopped
    fn transmit(&mut self) {
        loop {
            let Some(wait) = self.time_to_wakeup() else {
                break;
            };
            if !wait.is_zero() {
                match self.stop_rx.recv_timeout(wait.min(MAX_WAIT)) {
                    Err(RecvTimeoutError::Timeout) => {
                        if wait > MAX_WAIT {
                            continue;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            let pending = {
                let mut shared = self.inner.lock();
                if !shared.is_current(self.run_id, Phase::Running) {
                    break;
                }
                let encoding = shared.config.encoding.clone();
                shared.scheduler.on_timer(&*self.inner.clock, &encoding);
                self.metrics.scheduler = shared.scheduler.stats();
                self.collect(&shared)
            };
            self.metrics.wakeups += 1;
            self.render_all(pending);
            self.metrics.maybe_log();
        }
    }

    /// Time until the scheduler wants the timer to fire
    ///
    /// `None` once the run is no longer live.
    fn time_to_wakeup(&self) -> Option<Duration> {
        let shared = self.inner.lock();
        if !shared.is_current(self.run_id, Phase::Running) {
            return None;
        }
        let wake = shared.scheduler.next_wakeup_tick()?;
        let state = shared.scheduler.state()?;
        let leeway = shared.scheduler.tolerances().timer_leeway.as_secs_f64();
        let frequency = state.tick_frequency();
        drop(shared);

        let now = self.inner.clock.hardware_ticks();
        let seconds = wake.saturating_sub(now) as f64 / frequency;
        if seconds <= leeway {
            return Some(Duration::ZERO);
        }
        Some(Duration::from_secs_f64(seconds.min(MAX_WAIT.as_secs_f64() * 2.0)))
    }

    /// Pair scheduler events with the carrier settings in force now
    fn collect(&self, shared: &Shared) -> Vec<PendingSecond> {
        let params = SecondParams::from(&shared.config.carrier);
        shared
            .drain_scheduler_events()
            .into_iter()
            .map(|event| PendingSecond { event, params })
            .collect()
    }

    fn render_all(&mut self, pending: Vec<PendingSecond>) {
        for PendingSecond { event, params } in pending {
            match event {
                SchedulerEvent::FrameRebuilt { minute, length } => {
                    let shared = self.inner.lock();
                    if !shared.is_current(self.run_id, Phase::Running) {
                        return;
                    }
                    self.inner
                        .emit(GeneratorEvent::FrameRebuilt { minute, length });
                }
                SchedulerEvent::SecondReady {
                    symbol,
                    index,
                    hardware_tick,
                } => {
                    let started = Instant::now();
                    let samples =
                        self.synth
                            .render(symbol, index, self.format, &params, &mut self.phase);
                    self.metrics.record_render(started.elapsed(), samples.len());

                    // Enqueue under the lock so nothing lands after `stop` returns
                    let shared = self.inner.lock();
                    if !shared.is_current(self.run_id, Phase::Running) {
                        debug!(run = self.run_id, index, "Dropping second of a stopped run");
                        return;
                    }
                    if let Err(e) = self.inner.sink.enqueue(&samples, Some(hardware_tick)) {
                        self.metrics.enqueue_failures += 1;
                        warn!(index, "Audio sink rejected second: {}", e);
                    }
                    drop(shared);
                }
            }
        }
    }
}
