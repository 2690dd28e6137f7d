//! Frame encoding
//!
//! Bit layout (second: weight), BCD with the most significant bit first:
//!
//! ```text
//! minute      1-3: 40 20 10       5-8: 8 4 2 1
//! hour      12-13: 20 10        15-18: 8 4 2 1
//! day      22-23: 200 100       25-28: 80 40 20 10    30-33: 8 4 2 1
//! parity       36: hour          37: minute
//! year      41-44: 80 40 20 10  45-48: 8 4 2 1   (Morse 40-48 on call sign minutes)
//! weekday   50-52: 4 2 1
//! leap         53: warning       54: insert
//! markers   0 9 19 29 39 49 59
//! ```

use chrono::{DateTime, Utc};

use crate::config::{EncodingOptions, LeapSecondKind};

use super::context::{TimeFrameContext, jst_minute_start};
use super::frame::{FRAME_SECONDS, Frame, MARKER_POSITIONS};
use super::leap::LeapSecondState;
use super::symbol::Symbol;

pub(crate) const MINUTE_TENS: [usize; 3] = [1, 2, 3];
pub(crate) const MINUTE_ONES: [usize; 4] = [5, 6, 7, 8];
pub(crate) const HOUR_TENS: [usize; 2] = [12, 13];
pub(crate) const HOUR_ONES: [usize; 4] = [15, 16, 17, 18];
pub(crate) const YDAY_HUNDREDS: [usize; 2] = [22, 23];
pub(crate) const YDAY_TENS: [usize; 4] = [25, 26, 27, 28];
pub(crate) const YDAY_ONES: [usize; 4] = [30, 31, 32, 33];
pub(crate) const HOUR_PARITY: usize = 36;
pub(crate) const MINUTE_PARITY: usize = 37;
pub(crate) const RESERVED: [usize; 2] = [38, 40];
pub(crate) const YEAR_TENS: [usize; 4] = [41, 42, 43, 44];
pub(crate) const YEAR_ONES: [usize; 4] = [45, 46, 47, 48];
pub(crate) const CALLSIGN_SECONDS: [usize; 9] = [40, 41, 42, 43, 44, 45, 46, 47, 48];
pub(crate) const WEEKDAY: [usize; 3] = [50, 51, 52];
pub(crate) const LEAP_WARNING: usize = 53;
pub(crate) const LEAP_DIRECTION: usize = 54;
pub(crate) const STATUS_SECONDS: [usize; 6] = [50, 51, 52, 53, 54, 55];

/// First second of the call sign window
pub const CALLSIGN_WINDOW_START: usize = 40;

/// Minutes on which the call sign replaces the year
const CALLSIGN_MINUTES: [u32; 2] = [15, 45];

/// Builds [`Frame`]s from instants
///
/// Pure: the same instant and options always give the same frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameBuilder;

impl FrameBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Encode the JST minute containing `instant`
    pub fn build(&self, instant: DateTime<Utc>, options: &EncodingOptions) -> Frame {
        let context = TimeFrameContext::from_instant(instant);
        let leap = LeapSecondState::resolve(instant, options);
        let symbols = self.encode(&context, leap, options);
        Frame::new(symbols, jst_minute_start(instant))
    }

    /// Encode already-resolved calendar fields and leap state
    pub fn encode(
        &self,
        context: &TimeFrameContext,
        leap: LeapSecondState,
        options: &EncodingOptions,
    ) -> Vec<Symbol> {
        let mut symbols = vec![Symbol::Bit0; FRAME_SECONDS];
        for position in MARKER_POSITIONS {
            symbols[position] = Symbol::Mark;
        }
        symbols[FRAME_SECONDS - 1] = Symbol::Mark;

        let minute = context.minute;
        let hour = context.hour;
        let yday = context.day_of_year;

        write_bcd(&mut symbols, &MINUTE_TENS, minute / 10);
        write_bcd(&mut symbols, &MINUTE_ONES, minute % 10);
        write_bcd(&mut symbols, &HOUR_TENS, hour / 10);
        write_bcd(&mut symbols, &HOUR_ONES, hour % 10);
        write_bcd(&mut symbols, &YDAY_HUNDREDS, (yday / 100) % 10);
        write_bcd(&mut symbols, &YDAY_TENS, (yday / 10) % 10);
        write_bcd(&mut symbols, &YDAY_ONES, yday % 10);

        symbols[HOUR_PARITY] =
            Symbol::from_bit(parity(&symbols, &[&HOUR_TENS[..], &HOUR_ONES[..]]));
        symbols[MINUTE_PARITY] =
            Symbol::from_bit(parity(&symbols, &[&MINUTE_TENS[..], &MINUTE_ONES[..]]));

        for position in RESERVED {
            symbols[position] = Symbol::Bit0;
        }

        let callsign_minute = options.enable_callsign && CALLSIGN_MINUTES.contains(&minute);
        if callsign_minute {
            for position in CALLSIGN_SECONDS {
                symbols[position] = Symbol::Morse;
            }
        } else {
            let year = context.year_of_century();
            write_bcd(&mut symbols, &YEAR_TENS, year / 10);
            write_bcd(&mut symbols, &YEAR_ONES, year % 10);
        }

        if options.enable_service_status_bits && callsign_minute {
            for (i, position) in STATUS_SECONDS.into_iter().enumerate() {
                symbols[position] = Symbol::from_bit(options.service_status_bits.get(i));
            }
        } else {
            write_bcd(&mut symbols, &WEEKDAY, context.weekday);
            if leap.warning {
                symbols[LEAP_WARNING] = Symbol::Bit1;
                symbols[LEAP_DIRECTION] =
                    Symbol::from_bit(leap.direction == LeapSecondKind::Insert);
            }
        }

        if leap.insert {
            symbols[FRAME_SECONDS - 1] = Symbol::Bit0;
            symbols.push(Symbol::Mark);
        } else if leap.delete {
            symbols[FRAME_SECONDS - 2] = Symbol::Mark;
            if symbols.len() == FRAME_SECONDS {
                symbols.truncate(FRAME_SECONDS - 1);
            }
        }

        symbols
    }
}

/// Write `value` MSB-first into `positions`; bits beyond the field width are dropped
fn write_bcd(symbols: &mut [Symbol], positions: &[usize], value: u32) {
    let width = positions.len();
    for (i, &position) in positions.iter().enumerate() {
        let shift = width - 1 - i;
        symbols[position] = Symbol::from_bit((value >> shift) & 1 == 1);
    }
}

/// Even parity bit over the listed groups
pub(crate) fn parity(symbols: &[Symbol], groups: &[&[usize]]) -> bool {
    groups
        .iter()
        .flat_map(|group| group.iter())
        .filter(|&&position| symbols[position] == Symbol::Bit1)
        .count()
        % 2
        == 1
}
