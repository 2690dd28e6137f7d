//! Per-second modulation symbols

/// What the carrier does during one second of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Position marker, full power for 0.2 s
    Mark,
    /// Binary 0, full power for 0.8 s
    Bit0,
    /// Binary 1, full power for 0.5 s
    Bit1,
    /// Carrier keyed by the call sign envelope
    Morse,
}

impl Symbol {
    pub fn from_bit(bit: bool) -> Self {
        if bit { Symbol::Bit1 } else { Symbol::Bit0 }
    }

    /// Binary value carried, if this is a data symbol
    pub fn bit(self) -> Option<bool> {
        match self {
            Symbol::Bit0 => Some(false),
            Symbol::Bit1 => Some(true),
            Symbol::Mark | Symbol::Morse => None,
        }
    }

    /// Seconds of full power at the start of the second
    ///
    /// `None` for [`Symbol::Morse`], whose envelope comes from the call sign.
    pub fn high_duration(self) -> Option<f64> {
        match self {
            Symbol::Mark => Some(0.2),
            Symbol::Bit1 => Some(0.5),
            Symbol::Bit0 => Some(0.8),
            Symbol::Morse => None,
        }
    }
}
