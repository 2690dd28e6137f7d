//! Frame encoding tests

use chrono::{DateTime, TimeZone, Utc};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use super::*;
use crate::config::{EncodingOptions, LeapSecondKind, LeapSecondPlan, ServiceStatusBits};

fn jst_instant(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    jst()
        .with_ymd_and_hms(y, mo, d, h, mi, s)
        .unwrap()
        .with_timezone(&Utc)
}

fn build(instant: DateTime<Utc>, options: &EncodingOptions) -> Frame {
    FrameBuilder::new().build(instant, options)
}

fn decode(frame: &Frame) -> DecodedFrame {
    DecodedFrame::decode(frame).expect("markers in place")
}

fn leap_configurations() -> Vec<EncodingOptions> {
    let plain = EncodingOptions::default();
    let mut configs = vec![plain.clone()];
    for (pending, inserted) in [(true, true), (true, false), (false, true)] {
        configs.push(EncodingOptions {
            leap_second_pending: pending,
            leap_second_inserted: inserted,
            ..plain.clone()
        });
    }
    for kind in [LeapSecondKind::Insert, LeapSecondKind::Delete] {
        configs.push(EncodingOptions {
            leap_second_plan: Some(LeapSecondPlan {
                year_utc: 2016,
                month_utc: 12,
                kind,
            }),
            ..plain.clone()
        });
    }
    configs.push(EncodingOptions {
        enable_callsign: false,
        enable_service_status_bits: true,
        ..plain
    });
    configs
}

// =============================================================
// Length and marker invariants
// =============================================================

#[test]
fn test_length_and_markers_for_all_leap_configurations() {
    let instants = [
        jst_instant(2025, 1, 15, 14, 30, 0),
        jst_instant(2025, 1, 15, 14, 45, 30),
        jst_instant(2016, 12, 20, 0, 15, 0),
        jst_instant(2017, 1, 1, 8, 59, 0),
        jst_instant(2017, 1, 1, 8, 59, 59),
        jst_instant(2024, 12, 31, 23, 59, 59),
    ];

    for options in leap_configurations() {
        for instant in instants {
            let frame = build(instant, &options);
            assert!(
                (59..=61).contains(&frame.len()),
                "length {} at {instant}",
                frame.len()
            );
            assert_eq!(frame.marker_positions(), frame.expected_markers());
        }
    }
}

#[test]
fn test_ordinary_frame_is_sixty_seconds() {
    let frame = build(jst_instant(2025, 3, 3, 3, 3, 3), &EncodingOptions::default());
    assert_eq!(frame.len(), FRAME_SECONDS);
    assert_eq!(frame.get(59), Some(Symbol::Mark));
    assert!(!frame.is_leap_insert());
    assert!(!frame.is_leap_delete());
}

#[test]
fn test_frame_minute_is_jst_minute_start() {
    let instant = jst_instant(2025, 1, 15, 14, 30, 42);
    let frame = build(instant, &EncodingOptions::default());
    assert_eq!(frame.minute(), jst().with_ymd_and_hms(2025, 1, 15, 14, 30, 0).unwrap());
}

// =============================================================
// Field encoding
// =============================================================

#[test]
fn test_known_minute_symbols() {
    // Wednesday 2025-01-15 14:30 JST, day 15
    let frame = build(jst_instant(2025, 1, 15, 14, 30, 0), &EncodingOptions::default());
    let s = frame.symbols();

    // minute 30: 011 0000
    assert_eq!(&s[1..4], &[Symbol::Bit0, Symbol::Bit1, Symbol::Bit1]);
    assert!(s[5..9].iter().all(|&b| b == Symbol::Bit0));
    // hour 14: 01 0100
    assert_eq!(&s[12..14], &[Symbol::Bit0, Symbol::Bit1]);
    assert_eq!(
        &s[15..19],
        &[Symbol::Bit0, Symbol::Bit1, Symbol::Bit0, Symbol::Bit0]
    );
    // both parities even
    assert_eq!(s[36], Symbol::Bit0);
    assert_eq!(s[37], Symbol::Bit0);
    // weekday 3: 011
    assert_eq!(&s[50..53], &[Symbol::Bit0, Symbol::Bit1, Symbol::Bit1]);
    assert_eq!(s[38], Symbol::Bit0);
    assert_eq!(s[40], Symbol::Bit0);

    let decoded = decode(&frame);
    assert_eq!(decoded.minute, 30);
    assert_eq!(decoded.hour, 14);
    assert_eq!(decoded.day_of_year, 15);
    assert_eq!(decoded.year, Some(25));
    assert_eq!(decoded.weekday, 3);
    assert!(!decoded.callsign);
}

#[test]
fn test_build_is_deterministic() {
    let instant = jst_instant(2025, 1, 15, 14, 30, 0);
    let options = EncodingOptions::default();
    assert_eq!(build(instant, &options), build(instant, &options));
    // Any second within the minute gives the same frame
    assert_eq!(
        build(instant, &options),
        build(jst_instant(2025, 1, 15, 14, 30, 59), &options)
    );
}

#[test]
fn test_field_extremes_decode() {
    let options = EncodingOptions::default();

    let midnight = decode(&build(jst_instant(2025, 6, 1, 0, 0, 0), &options));
    assert_eq!((midnight.hour, midnight.minute), (0, 0));

    let late = decode(&build(jst_instant(2025, 6, 1, 23, 59, 0), &options));
    assert_eq!((late.hour, late.minute), (23, 59));

    let leap_day = decode(&build(jst_instant(2024, 12, 31, 12, 0, 0), &options));
    assert_eq!(leap_day.day_of_year, 366);
    assert_eq!(leap_day.year, Some(24));
}

#[test]
fn test_utc_instant_maps_to_jst_fields() {
    // 2020-07-04 02:36:58 UTC, a Saturday
    let instant = DateTime::from_timestamp(1_593_830_218, 0).unwrap();
    let decoded = decode(&build(instant, &EncodingOptions::default()));
    assert_eq!(decoded.hour, 11);
    assert_eq!(decoded.minute, 36);
    assert_eq!(decoded.day_of_year, 186);
    assert_eq!(decoded.year, Some(20));
    assert_eq!(decoded.weekday, 6);
}

#[test]
fn test_day_rolls_over_in_jst() {
    // 15:00 UTC on Dec 31 is already Jan 1 in Japan
    let instant = Utc.with_ymd_and_hms(2024, 12, 31, 15, 0, 0).unwrap();
    let decoded = decode(&build(instant, &EncodingOptions::default()));
    assert_eq!(decoded.day_of_year, 1);
    assert_eq!(decoded.year, Some(25));
    assert_eq!(decoded.hour, 0);
}

#[test]
fn test_parity_over_random_instants() {
    let mut rng = Pcg64::seed_from_u64(0x4a4a59);
    let options = EncodingOptions::default();
    let start = jst_instant(2000, 1, 1, 0, 0, 0).timestamp();
    let end = jst_instant(2099, 12, 31, 23, 59, 59).timestamp();

    for _ in 0..200 {
        let instant = DateTime::from_timestamp(rng.random_range(start..end), 0).unwrap();
        let decoded = decode(&build(instant, &options));
        assert!(decoded.hour_parity_ok, "hour parity at {instant}");
        assert!(decoded.minute_parity_ok, "minute parity at {instant}");
        let context = TimeFrameContext::from_instant(instant);
        assert_eq!(decoded.minute, context.minute);
        assert_eq!(decoded.hour, context.hour);
        assert_eq!(decoded.day_of_year, context.day_of_year);
    }
}

// =============================================================
// Call sign and service status
// =============================================================

#[test]
fn test_callsign_minutes_carry_morse() {
    let options = EncodingOptions::default();
    for minute in [15, 45] {
        let frame = build(jst_instant(2025, 1, 15, 9, minute, 0), &options);
        assert!((40..=48).all(|i| frame.get(i) == Some(Symbol::Morse)));
        let decoded = decode(&frame);
        assert!(decoded.callsign);
        assert_eq!(decoded.year, None);
        assert_eq!(decoded.minute, minute);
    }

    let other = build(jst_instant(2025, 1, 15, 9, 16, 0), &options);
    assert!(!other.symbols().contains(&Symbol::Morse));
}

#[test]
fn test_callsign_disabled_keeps_year() {
    let options = EncodingOptions {
        enable_callsign: false,
        ..EncodingOptions::default()
    };
    let frame = build(jst_instant(2025, 1, 15, 9, 15, 0), &options);
    assert!(!frame.symbols().contains(&Symbol::Morse));
    assert_eq!(decode(&frame).year, Some(25));
}

#[test]
fn test_status_bits_replace_weekday_on_callsign_minutes() {
    let options = EncodingOptions {
        enable_service_status_bits: true,
        service_status_bits: ServiceStatusBits([true, false, true, true, false, true]),
        ..EncodingOptions::default()
    };

    let frame = build(jst_instant(2025, 1, 15, 9, 45, 0), &options);
    assert_eq!(decode(&frame).status_bits, options.service_status_bits);

    // Outside call sign minutes the weekday is sent
    let frame = build(jst_instant(2025, 1, 15, 9, 44, 0), &options);
    assert_eq!(decode(&frame).weekday, 3);
    assert_eq!(frame.get(55), Some(Symbol::Bit0));
}

// =============================================================
// Leap seconds
// =============================================================

#[test]
fn test_leap_insert_shape() {
    let options = EncodingOptions {
        leap_second_plan: Some(LeapSecondPlan {
            year_utc: 2016,
            month_utc: 12,
            kind: LeapSecondKind::Insert,
        }),
        ..EncodingOptions::default()
    };
    let frame = build(jst_instant(2017, 1, 1, 8, 59, 10), &options);
    assert_eq!(frame.len(), 61);
    assert_eq!(frame.get(59), Some(Symbol::Bit0));
    assert_eq!(frame.get(60), Some(Symbol::Mark));

    let decoded = decode(&frame);
    assert!(decoded.leap_warning);
    assert!(decoded.leap_insert);
}

#[test]
fn test_leap_delete_shape() {
    let options = EncodingOptions {
        leap_second_plan: Some(LeapSecondPlan {
            year_utc: 2030,
            month_utc: 6,
            kind: LeapSecondKind::Delete,
        }),
        ..EncodingOptions::default()
    };
    let frame = build(jst_instant(2030, 7, 1, 8, 59, 0), &options);
    assert_eq!(frame.len(), 59);
    assert_eq!(frame.get(58), Some(Symbol::Mark));
    assert!(frame.is_leap_delete());
    assert!(!decode(&frame).leap_insert);
}

#[test]
fn test_leap_warning_without_execution() {
    let options = EncodingOptions {
        leap_second_plan: Some(LeapSecondPlan {
            year_utc: 2016,
            month_utc: 12,
            kind: LeapSecondKind::Insert,
        }),
        ..EncodingOptions::default()
    };
    let frame = build(jst_instant(2016, 12, 20, 12, 0, 0), &options);
    assert_eq!(frame.len(), 60);
    assert_eq!(frame.get(53), Some(Symbol::Bit1));
    assert_eq!(frame.get(54), Some(Symbol::Bit1));
}

#[test]
fn test_manual_leap_flags() {
    let options = EncodingOptions {
        leap_second_pending: true,
        leap_second_inserted: false,
        ..EncodingOptions::default()
    };
    let frame = build(jst_instant(2025, 1, 15, 14, 30, 0), &options);
    assert_eq!(frame.len(), 59);
    assert_eq!(frame.get(53), Some(Symbol::Bit1));
    assert_eq!(frame.get(54), Some(Symbol::Bit0));
}

// =============================================================
// Out-of-range instants
// =============================================================

#[test]
fn test_far_instants_still_produce_valid_frames() {
    let instants = [
        DateTime::from_timestamp(0, 0).unwrap(),
        Utc.with_ymd_and_hms(-4000, 2, 29, 23, 59, 59).unwrap(),
        Utc.with_ymd_and_hms(200_000, 12, 31, 23, 59, 59).unwrap(),
    ];
    for options in leap_configurations() {
        for instant in instants {
            let frame = build(instant, &options);
            assert_eq!(frame.marker_positions(), frame.expected_markers());
            let decoded = decode(&frame);
            assert!(decoded.year.is_none_or(|year| year < 100));
        }
    }
}

#[test]
fn test_negative_year_wraps_into_century() {
    let context = TimeFrameContext::from_instant(Utc.with_ymd_and_hms(-1, 6, 1, 0, 0, 0).unwrap());
    assert_eq!(context.year_of_century(), 99);
}
