//! Morse call sign envelope
//!
//! During announcement minutes the carrier keys "JJY JJY" in Morse across
//! seconds 40-48. The pattern is stored as runs of (units, keyed) and timed
//! so that its 97 units fill the 9 second window exactly.

use std::sync::LazyLock;

/// Length of the call sign window in seconds
pub const CALLSIGN_WINDOW_SECONDS: f64 = 9.0;

/// Text keyed during the call sign window
pub const CALLSIGN_TEXT: &str = "JJY JJY";

/// Units in [`CALLSIGN_TEXT`]
pub const CALLSIGN_UNITS: u32 = 97;

/// Unit duration that stretches the call sign over the window
pub const CALLSIGN_UNIT_SECONDS: f64 = CALLSIGN_WINDOW_SECONDS / CALLSIGN_UNITS as f64;

const DOT: u32 = 1;
const DASH: u32 = 3;
const ELEMENT_GAP: u32 = 1;
const CHARACTER_GAP: u32 = 3;
const WORD_GAP: u32 = 7;

static CALLSIGN: LazyLock<MorsePattern> =
    LazyLock::new(|| MorsePattern::from_text(CALLSIGN_TEXT));

/// International Morse code for letters and digits
fn code_for(c: char) -> Option<&'static str> {
    let code = match c.to_ascii_uppercase() {
        'A' => ".-",
        'B' => "-...",
        'C' => "-.-.",
        'D' => "-..",
        'E' => ".",
        'F' => "..-.",
        'G' => "--.",
        'H' => "....",
        'I' => "..",
        'J' => ".---",
        'K' => "-.-",
        'L' => ".-..",
        'M' => "--",
        'N' => "-.",
        'O' => "---",
        'P' => ".--.",
        'Q' => "--.-",
        'R' => ".-.",
        'S' => "...",
        'T' => "-",
        'U' => "..-",
        'V' => "...-",
        'W' => ".--",
        'X' => "-..-",
        'Y' => "-.--",
        'Z' => "--..",
        '0' => "-----",
        '1' => ".----",
        '2' => "..---",
        '3' => "...--",
        '4' => "....-",
        '5' => ".....",
        '6' => "-....",
        '7' => "--...",
        '8' => "---..",
        '9' => "----.",
        _ => return None,
    };
    Some(code)
}

/// A keyed Morse sequence as (duration in units, carrier on) runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorsePattern {
    runs: Vec<(u32, bool)>,
}

impl MorsePattern {
    /// Encode `text`; spaces become word gaps, unknown characters are skipped
    pub fn from_text(text: &str) -> Self {
        let mut runs: Vec<(u32, bool)> = Vec::new();

        for (w, word) in text.split_whitespace().enumerate() {
            if w > 0 {
                runs.push((WORD_GAP, false));
            }
            let codes = word.chars().filter_map(code_for);
            for (c, code) in codes.enumerate() {
                if c > 0 {
                    runs.push((CHARACTER_GAP, false));
                }
                for (e, element) in code.chars().enumerate() {
                    if e > 0 {
                        runs.push((ELEMENT_GAP, false));
                    }
                    runs.push((if element == '-' { DASH } else { DOT }, true));
                }
            }
        }

        Self { runs }
    }

    /// The "JJY JJY" call sign
    pub fn callsign() -> &'static MorsePattern {
        &CALLSIGN
    }

    pub fn runs(&self) -> &[(u32, bool)] {
        &self.runs
    }

    /// Total length in units
    pub fn total_units(&self) -> u32 {
        self.runs.iter().map(|&(units, _)| units).sum()
    }

    /// Whether the carrier is keyed at `unit`
    pub fn is_on_at_unit(&self, unit: u64) -> bool {
        let mut start = 0u64;
        for &(units, on) in &self.runs {
            let end = start + u64::from(units);
            if unit < end {
                return on;
            }
            start = end;
        }
        false
    }

    /// Whether the carrier is keyed `offset_seconds` into the pattern
    pub fn is_on(&self, offset_seconds: f64, unit_duration: f64) -> bool {
        if !offset_seconds.is_finite() || !unit_duration.is_finite() || unit_duration <= 0.0 {
            return false;
        }
        if offset_seconds < 0.0 {
            return false;
        }
        self.is_on_at_unit((offset_seconds / unit_duration).floor() as u64)
    }
}

/// Call sign envelope for an offset into the 9 second window
///
/// False outside `[0, 9)`.
pub fn is_on(offset_seconds: f64, unit_duration: f64) -> bool {
    if !(0.0..CALLSIGN_WINDOW_SECONDS).contains(&offset_seconds) {
        return false;
    }
    MorsePattern::callsign().is_on(offset_seconds, unit_duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callsign_is_97_units() {
        assert_eq!(MorsePattern::callsign().total_units(), CALLSIGN_UNITS);
    }

    #[test]
    fn test_single_letter_units() {
        // J = .--- : 1+1+3+1+3+1+3
        assert_eq!(MorsePattern::from_text("J").total_units(), 13);
        // Y = -.-- : 3+1+1+1+3+1+3
        assert_eq!(MorsePattern::from_text("Y").total_units(), 13);
        // E T : 1 + 7 + 3
        assert_eq!(MorsePattern::from_text("E T").total_units(), 11);
    }

    #[test]
    fn test_starts_with_dot_of_j() {
        let unit = CALLSIGN_UNIT_SECONDS;
        assert!(is_on(0.0, unit));
        // Unit 1 is the element gap after the dot
        assert!(!is_on(1.5 * unit, unit));
        // Units 2-4 are the first dash
        assert!(is_on(2.5 * unit, unit));
        assert!(is_on(4.5 * unit, unit));
    }

    #[test]
    fn test_word_gap_between_repetitions() {
        let unit = CALLSIGN_UNIT_SECONDS;
        // First "JJY" is 45 units, then 7 units of silence
        for u in 45..52 {
            assert!(!is_on((u as f64 + 0.5) * unit, unit), "unit {} keyed", u);
        }
        // Second J begins with a dot at unit 52
        assert!(is_on(52.5 * unit, unit));
    }

    #[test]
    fn test_last_unit_keyed_and_window_edges() {
        let unit = CALLSIGN_UNIT_SECONDS;
        // Pattern ends on the final dash of Y
        assert!(is_on(96.5 * unit, unit));
        assert!(!is_on(-0.001, unit));
        assert!(!is_on(CALLSIGN_WINDOW_SECONDS, unit));
        assert!(!is_on(12.0, unit));
        assert!(!is_on(f64::NAN, unit));
    }

    #[test]
    fn test_duty_cycle_matches_runs() {
        let pattern = MorsePattern::callsign();
        let keyed: u32 = pattern
            .runs()
            .iter()
            .filter(|&&(_, on)| on)
            .map(|&(units, _)| units)
            .sum();
        let counted = (0..CALLSIGN_UNITS as u64)
            .filter(|&u| pattern.is_on_at_unit(u))
            .count() as u32;
        assert_eq!(keyed, counted);
    }
}
