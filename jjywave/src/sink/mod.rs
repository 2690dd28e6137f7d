//! Audio sinks
//!
//! The generator hands each rendered second to an [`AudioSink`] together
//! with the hardware tick at which it should start. Sinks are shared between
//! the control surface and the transmitter thread, so every method takes
//! `&self`.

mod memory;

#[cfg(feature = "cpal-output")]
mod cpal_output;

pub use memory::{EnqueuedBuffer, MemorySink};

#[cfg(feature = "cpal-output")]
pub use cpal_output::CpalSink;

/// Negotiated output format
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkFormat {
    pub sample_rate: f64,
    pub channels: u16,
}

/// Audio sink errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SinkError {
    /// No device could be opened
    #[error("audio output unavailable: {0}")]
    Unavailable(String),

    /// The device refused the requested format
    #[error("unsupported format: {sample_rate} Hz, {channels} channel(s)")]
    UnsupportedFormat { sample_rate: f64, channels: u16 },

    /// Samples were enqueued before a format was negotiated
    #[error("no format negotiated")]
    NotNegotiated,

    /// A buffer does not hold whole frames for the negotiated channel count
    #[error("{len} samples is not a whole number of {channels}-channel frames")]
    PartialFrame { len: usize, channels: u16 },

    /// The output stream failed
    #[error("audio stream error: {0}")]
    Stream(String),
}

/// Destination for rendered audio
pub trait AudioSink: Send + Sync {
    /// Open or reconfigure the output for this format
    fn negotiate(&self, sample_rate: f64, channels: u16) -> Result<(), SinkError>;

    /// The negotiated format, if any
    fn current_format(&self) -> Option<SinkFormat>;

    /// Queue interleaved samples
    ///
    /// With `start_tick` the samples should start sounding at that hardware
    /// tick; without it playback is immediate and best effort.
    fn enqueue(&self, samples: &[f32], start_tick: Option<u64>) -> Result<(), SinkError>;
}

/// Reject buffers that would leave the channels misaligned
pub(crate) fn check_frames(format: SinkFormat, len: usize) -> Result<(), SinkError> {
    let channels = usize::from(format.channels);
    if channels == 0 || len % channels != 0 {
        return Err(SinkError::PartialFrame {
            len,
            channels: format.channels,
        });
    }
    Ok(())
}
