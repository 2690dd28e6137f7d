//! Playback through the default output device
//!
//! The cpal stream lives on its own thread because `cpal::Stream` cannot be
//! shared across threads. Rendered seconds go through a `ringbuf` ring to the
//! device callback. Start ticks are honoured by padding silence in front of
//! a buffer when the queue would otherwise run out before it is due.

use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use jjywave_core::Clock;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::{debug, error, warn};

use super::{AudioSink, SinkError, SinkFormat, check_frames};

/// Seconds of audio the ring can hold
const RING_SECONDS: f64 = 2.5;

/// An open stream and the producer feeding it
struct OpenStream {
    format: SinkFormat,
    producer: HeapProd<f32>,
    /// Dropping this ends the stream thread
    shutdown: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for OpenStream {
    fn drop(&mut self) {
        // Disconnect first so the stream thread's recv() returns
        drop(self.shutdown.take());
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// [`AudioSink`] backed by the default cpal output device
pub struct CpalSink {
    clock: Arc<dyn Clock>,
    stream: Mutex<Option<OpenStream>>,
}

impl CpalSink {
    /// `clock` must be the clock the generator schedules against
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            stream: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<OpenStream>> {
        self.stream.lock().unwrap_or_else(|e| {
            warn!("cpal sink mutex poisoned; continuing");
            e.into_inner()
        })
    }

    fn open(format: SinkFormat) -> Result<OpenStream, SinkError> {
        let capacity = (format.sample_rate * RING_SECONDS).ceil() as usize
            * usize::from(format.channels);
        let ring = HeapRb::<f32>::new(capacity.max(1));
        let (producer, consumer) = ring.split();

        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), SinkError>>(1);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread = thread::Builder::new()
            .name("jjy-audio-out".into())
            .spawn(move || {
                let stream = match build_stream(format, consumer) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                debug!("Audio output thread started");
                // Blocks until the sender is dropped
                let _ = shutdown_rx.recv();
                drop(stream);
                debug!("Audio output thread finished");
            })
            .map_err(|e| SinkError::Unavailable(format!("failed to spawn output thread: {e}")))?;

        let open = OpenStream {
            format,
            producer,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        };
        match ready_rx.recv() {
            Ok(Ok(())) => Ok(open),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SinkError::Unavailable("output thread exited".into())),
        }
    }
}

impl AudioSink for CpalSink {
    fn negotiate(&self, sample_rate: f64, channels: u16) -> Result<(), SinkError> {
        let format = SinkFormat {
            sample_rate,
            channels,
        };
        let mut stream = self.lock();
        if stream.as_ref().is_some_and(|s| s.format == format) {
            return Ok(());
        }
        // Close the old stream before opening the device again
        *stream = None;
        *stream = Some(Self::open(format)?);
        debug!("Audio output opened at {} Hz, {} channel(s)", sample_rate, channels);
        Ok(())
    }

    fn current_format(&self) -> Option<SinkFormat> {
        self.lock().as_ref().map(|s| s.format)
    }

    fn enqueue(&self, samples: &[f32], start_tick: Option<u64>) -> Result<(), SinkError> {
        let mut guard = self.lock();
        let stream = guard.as_mut().ok_or(SinkError::NotNegotiated)?;
        check_frames(stream.format, samples.len())?;

        if let Some(start_tick) = start_tick {
            let padding = silence_before(&*self.clock, stream, start_tick);
            push_silence(&mut stream.producer, padding);
        }

        let pushed = stream.producer.push_slice(samples);
        if pushed < samples.len() {
            warn!(
                "Audio ring full, dropped {} of {} samples",
                samples.len() - pushed,
                samples.len()
            );
        }
        Ok(())
    }
}

/// Samples of silence needed so that a buffer queued now starts at `start_tick`
fn silence_before(clock: &dyn Clock, stream: &OpenStream, start_tick: u64) -> usize {
    let channels = usize::from(stream.format.channels);
    let queued_frames = stream.producer.occupied_len() / channels.max(1);
    let frequency = clock.tick_frequency();
    let now = clock.hardware_ticks();

    let queued_seconds = queued_frames as f64 / stream.format.sample_rate;
    let due_in = (start_tick as f64 - now as f64) / frequency;
    let gap = due_in - queued_seconds;
    if !gap.is_finite() || gap <= 0.0 {
        return 0;
    }
    (gap * stream.format.sample_rate).round() as usize * channels
}

fn push_silence(producer: &mut HeapProd<f32>, samples: usize) {
    const CHUNK: [f32; 512] = [0.0; 512];
    let mut remaining = samples.min(producer.vacant_len());
    while remaining > 0 {
        let n = remaining.min(CHUNK.len());
        let pushed = producer.push_slice(&CHUNK[..n]);
        if pushed == 0 {
            break;
        }
        remaining -= pushed;
    }
}

fn build_stream(
    format: SinkFormat,
    mut consumer: HeapCons<f32>,
) -> Result<cpal::Stream, SinkError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| SinkError::Unavailable("no audio output device available".into()))?;
    let default = device
        .default_output_config()
        .map_err(|e| SinkError::Unavailable(format!("failed to get default output config: {e}")))?;

    let config = cpal::StreamConfig {
        channels: format.channels,
        sample_rate: cpal::SampleRate(format.sample_rate.round() as u32),
        buffer_size: cpal::BufferSize::Default,
    };
    let unsupported = || SinkError::UnsupportedFormat {
        sample_rate: format.sample_rate,
        channels: format.channels,
    };

    let stream = match default.sample_format() {
        cpal::SampleFormat::F32 => device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let popped = consumer.pop_slice(data);
                data[popped..].fill(0.0);
            },
            |err| error!("Audio stream error: {}", err),
            None,
        ),
        cpal::SampleFormat::I16 => {
            let mut scratch: Vec<f32> = vec![0.0; 4096];
            device.build_output_stream(
                &config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    if scratch.len() < data.len() {
                        scratch.resize(data.len(), 0.0);
                    }
                    let popped = consumer.pop_slice(&mut scratch[..data.len()]);
                    for (out, &f) in data.iter_mut().zip(&scratch[..popped]) {
                        *out = (f * 32767.0).clamp(-32768.0, 32767.0) as i16;
                    }
                    data[popped..].fill(0);
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )
        }
        other => {
            warn!("Unsupported device sample format {:?}", other);
            return Err(unsupported());
        }
    }
    .map_err(|e| match e {
        cpal::BuildStreamError::StreamConfigNotSupported => unsupported(),
        other => SinkError::Stream(other.to_string()),
    })?;

    stream
        .play()
        .map_err(|e| SinkError::Stream(format!("failed to play audio stream: {e}")))?;
    Ok(stream)
}
