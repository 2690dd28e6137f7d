//! Reading fields back out of a frame

use crate::config::ServiceStatusBits;

use super::builder::{
    CALLSIGN_SECONDS, HOUR_ONES, HOUR_PARITY, HOUR_TENS, LEAP_DIRECTION, LEAP_WARNING,
    MINUTE_ONES, MINUTE_PARITY, MINUTE_TENS, STATUS_SECONDS, WEEKDAY, YDAY_HUNDREDS, YDAY_ONES,
    YDAY_TENS, YEAR_ONES, YEAR_TENS, parity,
};
use super::frame::Frame;
use super::symbol::Symbol;

/// Fields decoded from a [`Frame`], as a receiver would see them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame {
    pub minute: u32,
    pub hour: u32,
    pub day_of_year: u32,
    /// Two-digit year; `None` when the call sign occupies its seconds
    pub year: Option<u32>,
    /// Raw bits 50-52
    pub weekday: u32,
    pub hour_parity_ok: bool,
    pub minute_parity_ok: bool,
    pub leap_warning: bool,
    /// Bit 54: set for insertion
    pub leap_insert: bool,
    /// Raw bits 50-55
    pub status_bits: ServiceStatusBits,
    pub callsign: bool,
    /// Frame length in seconds
    pub length: usize,
}

impl DecodedFrame {
    /// Decode `frame`, or `None` if its markers are not where its length requires
    pub fn decode(frame: &Frame) -> Option<Self> {
        if frame.marker_positions() != frame.expected_markers() {
            return None;
        }
        let symbols = frame.symbols();

        let minute = read_bcd(symbols, &MINUTE_TENS) * 10 + read_bcd(symbols, &MINUTE_ONES);
        let hour = read_bcd(symbols, &HOUR_TENS) * 10 + read_bcd(symbols, &HOUR_ONES);
        let day_of_year = read_bcd(symbols, &YDAY_HUNDREDS) * 100
            + read_bcd(symbols, &YDAY_TENS) * 10
            + read_bcd(symbols, &YDAY_ONES);

        let callsign = CALLSIGN_SECONDS.iter().all(|&position| symbols[position] == Symbol::Morse);
        let year = (!callsign)
            .then(|| read_bcd(symbols, &YEAR_TENS) * 10 + read_bcd(symbols, &YEAR_ONES));

        let mut status_bits = ServiceStatusBits::default();
        for (i, position) in STATUS_SECONDS.into_iter().enumerate() {
            status_bits.set(i, is_one(symbols, position));
        }

        Some(Self {
            minute,
            hour,
            day_of_year,
            year,
            weekday: read_bcd(symbols, &WEEKDAY),
            hour_parity_ok: is_one(symbols, HOUR_PARITY)
                == parity(symbols, &[&HOUR_TENS[..], &HOUR_ONES[..]]),
            minute_parity_ok: is_one(symbols, MINUTE_PARITY)
                == parity(symbols, &[&MINUTE_TENS[..], &MINUTE_ONES[..]]),
            leap_warning: is_one(symbols, LEAP_WARNING),
            leap_insert: is_one(symbols, LEAP_DIRECTION),
            status_bits,
            callsign,
            length: frame.len(),
        })
    }
}

fn is_one(symbols: &[Symbol], position: usize) -> bool {
    symbols.get(position).copied() == Some(Symbol::Bit1)
}

fn read_bcd(symbols: &[Symbol], positions: &[usize]) -> u32 {
    positions
        .iter()
        .fold(0, |acc, &position| (acc << 1) | u32::from(is_one(symbols, position)))
}
