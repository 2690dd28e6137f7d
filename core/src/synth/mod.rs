//! One-second carrier rendering
//!
//! Each [`Symbol`] becomes exactly one second of interleaved `f32` PCM. The
//! carrier phase lives in a [`PhaseAccumulator`] owned by the audio path and
//! threaded through consecutive calls, so second boundaries are seamless.

use std::f64::consts::TAU;

use crate::config::{CarrierConfiguration, WaveformShape};
use crate::morse::{self, CALLSIGN_UNIT_SECONDS};
use crate::timecode::{CALLSIGN_WINDOW_START, Symbol};

#[cfg(test)]
mod tests;

/// Output sample format
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleFormat {
    pub sample_rate: f64,
    pub channels: u16,
}

impl SampleFormat {
    pub fn new(sample_rate: f64, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Frames (one sample per channel) in one second
    pub fn frames_per_second(&self) -> usize {
        if self.sample_rate.is_finite() && self.sample_rate > 0.0 {
            self.sample_rate.round() as usize
        } else {
            0
        }
    }
}

/// Running carrier phase in radians, kept in `[0, 2π)`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseAccumulator(f64);

impl PhaseAccumulator {
    pub fn new() -> Self {
        Self(0.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Back to zero for a fresh transmission
    pub fn reset(&mut self) {
        self.0 = 0.0;
    }

    /// Add `increment` radians and wrap
    #[inline]
    pub fn advance(&mut self, increment: f64) {
        let next = (self.0 + increment).rem_euclid(TAU);
        // rem_euclid can round up to exactly TAU for tiny negative inputs
        self.0 = if next.is_finite() && next < TAU { next } else { 0.0 };
    }
}

/// Carrier settings for one rendered second
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondParams {
    pub carrier_frequency: f64,
    pub gain: f32,
    pub low_amplitude_fraction: f32,
    pub waveform: WaveformShape,
}

impl From<&CarrierConfiguration> for SecondParams {
    fn from(carrier: &CarrierConfiguration) -> Self {
        Self {
            carrier_frequency: carrier.effective_frequency(),
            gain: carrier.gain,
            low_amplitude_fraction: carrier.low_amplitude_fraction,
            waveform: carrier.waveform,
        }
    }
}

/// Renders symbols as amplitude-keyed carrier
#[derive(Debug, Clone, Copy, Default)]
pub struct WaveformSynthesizer;

impl WaveformSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Render one second of `symbol` at `second_index` within its frame
    ///
    /// Returns `frames_per_second * channels` interleaved samples, every
    /// channel carrying the same value.
    pub fn render(
        &self,
        symbol: Symbol,
        second_index: usize,
        format: SampleFormat,
        params: &SecondParams,
        phase: &mut PhaseAccumulator,
    ) -> Vec<f32> {
        let frames = format.frames_per_second();
        let channels = usize::from(format.channels);
        let mut out = Vec::with_capacity(frames * channels);
        if frames == 0 || channels == 0 {
            return out;
        }

        let sample_rate = format.sample_rate;
        let increment = TAU * params.carrier_frequency / sample_rate;
        let increment = if increment.is_finite() { increment } else { 0.0 };
        let envelope = Envelope::for_symbol(symbol, second_index, sample_rate, params);

        for n in 0..frames {
            let amplitude = envelope.amplitude(n, sample_rate);
            let value = shape(params.waveform, phase.value()) * amplitude;
            out.extend(std::iter::repeat_n(value as f32, channels));
            phase.advance(increment);
        }
        out
    }
}

fn shape(waveform: WaveformShape, phase: f64) -> f64 {
    let s = phase.sin();
    match waveform {
        WaveformShape::Sine => s,
        WaveformShape::Square => {
            if s < 0.0 {
                -1.0
            } else {
                1.0
            }
        }
    }
}

/// Amplitude over the course of one second
enum Envelope {
    /// Full gain for the first `high_samples`, reduced gain afterwards
    Keyed {
        high_samples: usize,
        high: f64,
        low: f64,
    },
    /// Call sign keying, `offset` seconds into the window
    Morse { offset: f64, high: f64 },
}

impl Envelope {
    fn for_symbol(symbol: Symbol, second_index: usize, sample_rate: f64, p: &SecondParams) -> Self {
        let high = f64::from(p.gain);
        match symbol.high_duration() {
            Some(duration) => Envelope::Keyed {
                // f64::round is half-away-from-zero
                high_samples: (duration * sample_rate).round() as usize,
                high,
                low: high * f64::from(p.low_amplitude_fraction),
            },
            None => Envelope::Morse {
                offset: second_index.saturating_sub(CALLSIGN_WINDOW_START) as f64,
                high,
            },
        }
    }

    #[inline]
    fn amplitude(&self, n: usize, sample_rate: f64) -> f64 {
        match *self {
            Envelope::Keyed {
                high_samples,
                high,
                low,
            } => {
                if n < high_samples {
                    high
                } else {
                    low
                }
            }
            Envelope::Morse { offset, high } => {
                let t = offset + n as f64 / sample_rate;
                if morse::is_on(t, CALLSIGN_UNIT_SECONDS) {
                    high
                } else {
                    0.0
                }
            }
        }
    }
}
