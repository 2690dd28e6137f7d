//! One minute of time code

use chrono::{DateTime, FixedOffset};

use super::symbol::Symbol;

/// Seconds in an ordinary frame
pub const FRAME_SECONDS: usize = 60;

/// Marker positions present in every frame (position 59/58/60 varies)
pub const MARKER_POSITIONS: [usize; 6] = [0, 9, 19, 29, 39, 49];

/// An immutable minute of symbols, 59, 60 or 61 long
///
/// Frames are built whole by [`FrameBuilder`](super::FrameBuilder) and
/// replaced whole; nothing mutates one after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    symbols: Vec<Symbol>,
    /// JST start of the minute this frame encodes
    minute: DateTime<FixedOffset>,
}

impl Frame {
    pub(crate) fn new(symbols: Vec<Symbol>, minute: DateTime<FixedOffset>) -> Self {
        debug_assert!((59..=61).contains(&symbols.len()));
        Self { symbols, minute }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn get(&self, index: usize) -> Option<Symbol> {
        self.symbols.get(index).copied()
    }

    /// JST start of the encoded minute
    pub fn minute(&self) -> DateTime<FixedOffset> {
        self.minute
    }

    /// 61 seconds: a leap second is inserted at position 59
    pub fn is_leap_insert(&self) -> bool {
        self.symbols.len() == FRAME_SECONDS + 1
    }

    /// 59 seconds: the minute ends after the marker at 58
    pub fn is_leap_delete(&self) -> bool {
        self.symbols.len() == FRAME_SECONDS - 1
    }

    /// Positions that must hold [`Symbol::Mark`] for this frame's length
    pub fn expected_markers(&self) -> Vec<usize> {
        let mut markers = MARKER_POSITIONS.to_vec();
        if self.is_leap_insert() {
            markers.push(60);
        } else if self.is_leap_delete() {
            markers.push(58);
        } else {
            markers.push(59);
        }
        markers
    }

    /// Positions that actually hold [`Symbol::Mark`]
    pub fn marker_positions(&self) -> Vec<usize> {
        self.symbols
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == Symbol::Mark)
            .map(|(i, _)| i)
            .collect()
    }
}
