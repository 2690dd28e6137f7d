//! Waveform synthesis tests

use std::f64::consts::TAU;

use super::*;
use crate::config::WaveformShape;
use crate::morse::CALLSIGN_UNIT_SECONDS;
use crate::timecode::Symbol;

fn params(waveform: WaveformShape) -> SecondParams {
    SecondParams {
        carrier_frequency: 13_333.333,
        gain: 1.0,
        low_amplitude_fraction: 0.1,
        waveform,
    }
}

fn render(symbol: Symbol, index: usize, format: SampleFormat, p: &SecondParams) -> Vec<f32> {
    let mut phase = PhaseAccumulator::new();
    WaveformSynthesizer::new().render(symbol, index, format, p, &mut phase)
}

/// First channel of each frame
fn mono(samples: &[f32], channels: u16) -> Vec<f32> {
    samples.chunks(usize::from(channels)).map(|c| c[0]).collect()
}

// =============================================================
// Sample counts and channel layout
// =============================================================

#[test]
fn test_one_second_of_samples_per_channel() {
    let p = params(WaveformShape::Sine);
    assert_eq!(
        render(Symbol::Mark, 0, SampleFormat::new(48_000.0, 2), &p).len(),
        96_000
    );
    assert_eq!(
        render(Symbol::Bit1, 1, SampleFormat::new(44_100.4, 1), &p).len(),
        44_100
    );
}

#[test]
fn test_channels_carry_identical_samples() {
    let samples = render(
        Symbol::Bit1,
        1,
        SampleFormat::new(8_000.0, 3),
        &params(WaveformShape::Sine),
    );
    for frame in samples.chunks(3) {
        assert_eq!(frame[0], frame[1]);
        assert_eq!(frame[1], frame[2]);
    }
}

#[test]
fn test_unusable_format_renders_nothing() {
    let p = params(WaveformShape::Sine);
    assert!(render(Symbol::Mark, 0, SampleFormat::new(0.0, 2), &p).is_empty());
    assert!(render(Symbol::Mark, 0, SampleFormat::new(f64::NAN, 2), &p).is_empty());
    assert!(render(Symbol::Mark, 0, SampleFormat::new(48_000.0, 0), &p).is_empty());
}

// =============================================================
// Envelopes
// =============================================================

#[test]
fn test_high_durations() {
    let p = params(WaveformShape::Square);
    let format = SampleFormat::new(96_000.0, 2);

    for (symbol, high) in [
        (Symbol::Mark, 19_200),
        (Symbol::Bit1, 48_000),
        (Symbol::Bit0, 76_800),
    ] {
        let samples = mono(&render(symbol, 1, format, &p), 2);
        assert!(
            samples[..high].iter().all(|s| s.abs() == 1.0),
            "{symbol:?} high part"
        );
        assert!(
            samples[high..].iter().all(|s| (s.abs() - 0.1).abs() < 1e-6),
            "{symbol:?} low part"
        );
    }
}

#[test]
fn test_high_duration_rounds_half_away_from_zero() {
    // 0.5 s at 3 Hz is 1.5 samples
    let samples = render(
        Symbol::Bit1,
        1,
        SampleFormat::new(3.0, 1),
        &params(WaveformShape::Square),
    );
    assert_eq!(samples.len(), 3);
    assert_eq!(samples[1].abs(), 1.0);
    assert!((samples[2].abs() - 0.1).abs() < 1e-6);
}

#[test]
fn test_gain_scales_both_levels() {
    let p = SecondParams {
        gain: 0.5,
        ..params(WaveformShape::Square)
    };
    let samples = render(Symbol::Mark, 0, SampleFormat::new(1_000.0, 1), &p);
    assert_eq!(samples[0].abs(), 0.5);
    assert!((samples[999].abs() - 0.05).abs() < 1e-6);
}

#[test]
fn test_square_wave_takes_two_values() {
    let samples = render(
        Symbol::Bit0,
        1,
        SampleFormat::new(48_000.0, 1),
        &params(WaveformShape::Square),
    );
    let high = &samples[..38_400];
    assert!(high.iter().all(|&s| s == 1.0 || s == -1.0));
    assert!(high.contains(&1.0) && high.contains(&-1.0));
}

#[test]
fn test_morse_envelope_follows_callsign() {
    let rate = 9_700.0;
    let format = SampleFormat::new(rate, 1);
    let p = params(WaveformShape::Square);
    let unit_samples = (CALLSIGN_UNIT_SECONDS * rate).round() as usize;

    // Second 40: dot of J, then a unit gap
    let first = render(Symbol::Morse, 40, format, &p);
    assert_eq!(first[unit_samples / 2].abs(), 1.0);
    assert_eq!(first[unit_samples + unit_samples / 2], 0.0);

    // Second 48 ends on the final dash of Y
    let last = render(Symbol::Morse, 48, format, &p);
    assert_eq!(last[last.len() - 1].abs(), 1.0);

    // Units 45-51 (4.17-4.82 s into the window) are the word gap
    let gap = render(Symbol::Morse, 44, format, &p);
    let start = (0.3 * rate) as usize;
    assert!(gap[start..start + 300].iter().all(|&s| s == 0.0));
}

// =============================================================
// Phase continuity
// =============================================================

#[test]
fn test_phase_wraps_into_range() {
    let mut phase = PhaseAccumulator::new();
    for _ in 0..1000 {
        phase.advance(2.9);
        assert!((0.0..TAU).contains(&phase.value()));
    }
    phase.advance(-10.0);
    assert!((0.0..TAU).contains(&phase.value()));
    phase.reset();
    assert_eq!(phase.value(), 0.0);
}

#[test]
fn test_phase_continuous_across_seconds() {
    let rate = 48_000.0;
    let frequency = 1_000.25;
    let format = SampleFormat::new(rate, 1);
    let p = SecondParams {
        carrier_frequency: frequency,
        low_amplitude_fraction: 1.0,
        ..params(WaveformShape::Sine)
    };
    let synth = WaveformSynthesizer::new();
    let mut phase = PhaseAccumulator::new();

    let a = synth.render(Symbol::Mark, 0, format, &p, &mut phase);
    let b = synth.render(Symbol::Bit0, 1, format, &p, &mut phase);

    let max_step = TAU * frequency / rate;
    let boundary = f64::from(b[0] - a[a.len() - 1]).abs();
    assert!(boundary <= max_step + 1e-4, "jump {boundary}");

    // The threaded phase equals one unbroken second of advance
    let expected = (TAU * frequency / rate * rate).rem_euclid(TAU);
    let first_of_b = expected.sin();
    assert!((f64::from(b[0]) - first_of_b).abs() < 1e-3);
}

#[test]
fn test_params_from_carrier_configuration() {
    let mut carrier = crate::config::CarrierConfiguration::default();
    carrier.test_mode = true;
    carrier.test_frequency = 440.0;
    carrier.waveform = WaveformShape::Square;
    let p = SecondParams::from(&carrier);
    assert_eq!(p.carrier_frequency, 440.0);
    assert_eq!(p.waveform, WaveformShape::Square);
}
