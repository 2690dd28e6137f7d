//! In-memory sink that records everything it is given

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{AudioSink, SinkError, SinkFormat, check_frames};

/// One call to [`AudioSink::enqueue`]
#[derive(Debug, Clone, PartialEq)]
pub struct EnqueuedBuffer {
    pub samples: Vec<f32>,
    pub start_tick: Option<u64>,
}

#[derive(Debug, Default)]
struct Recording {
    format: Option<SinkFormat>,
    buffers: Vec<EnqueuedBuffer>,
    negotiations: usize,
}

/// Sink that keeps every buffer, for tests and offline rendering
///
/// Negotiation can be made to fail to simulate a missing device.
#[derive(Debug, Default)]
pub struct MemorySink {
    recording: Mutex<Recording>,
    /// Signalled whenever a buffer is recorded
    recorded: Condvar,
    fail_negotiation: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose negotiation always fails
    pub fn failing() -> Self {
        let sink = Self::new();
        sink.set_fail_negotiation(true);
        sink
    }

    pub fn set_fail_negotiation(&self, fail: bool) {
        self.fail_negotiation.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.recording.lock().unwrap_or_else(|e| {
            tracing::warn!("Memory sink mutex poisoned; continuing");
            e.into_inner()
        })
    }

    /// Copy of every buffer recorded so far
    pub fn buffers(&self) -> Vec<EnqueuedBuffer> {
        self.lock().buffers.clone()
    }

    pub fn buffer_count(&self) -> usize {
        self.lock().buffers.len()
    }

    /// Remove and return the recorded buffers
    pub fn take_buffers(&self) -> Vec<EnqueuedBuffer> {
        std::mem::take(&mut self.lock().buffers)
    }

    /// Successful negotiations so far
    pub fn negotiations(&self) -> usize {
        self.lock().negotiations
    }

    /// Block until at least `count` buffers are recorded or `timeout` passes
    ///
    /// Returns whether the count was reached.
    pub fn wait_for_buffers(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut recording = self.lock();
        while recording.buffers.len() < count {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            recording = match self.recorded.wait_timeout(recording, remaining) {
                Ok((guard, _)) => guard,
                Err(e) => {
                    tracing::warn!("Memory sink condvar mutex poisoned; continuing");
                    e.into_inner().0
                }
            };
        }
        true
    }
}

impl AudioSink for MemorySink {
    fn negotiate(&self, sample_rate: f64, channels: u16) -> Result<(), SinkError> {
        if self.fail_negotiation.load(Ordering::SeqCst) {
            return Err(SinkError::Unavailable("negotiation disabled".into()));
        }
        if !sample_rate.is_finite() || sample_rate <= 0.0 || channels == 0 {
            return Err(SinkError::UnsupportedFormat {
                sample_rate,
                channels,
            });
        }
        let mut recording = self.lock();
        recording.format = Some(SinkFormat {
            sample_rate,
            channels,
        });
        recording.negotiations += 1;
        Ok(())
    }

    fn current_format(&self) -> Option<SinkFormat> {
        self.lock().format
    }

    fn enqueue(&self, samples: &[f32], start_tick: Option<u64>) -> Result<(), SinkError> {
        let mut recording = self.lock();
        let format = recording.format.ok_or(SinkError::NotNegotiated)?;
        check_frames(format, samples.len())?;
        recording.buffers.push(EnqueuedBuffer {
            samples: samples.to_vec(),
            start_tick,
        });
        drop(recording);
        self.recorded.notify_all();
        Ok(())
    }
}
