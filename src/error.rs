//! Unified error types for the signal driver.
//!
//! Invalid command input (bad pins, unknown colors, unmatched lamps) is never
//! an error here: those requests are logged at `debug` and dropped.  What
//! remains is small: a rejected configuration, and the one fatal condition,
//! a charlieplex bank with more than one live pin.

use core::fmt;

use crate::pins::PinId;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Pin bookkeeping shows an electrically invalid bank state.  Fatal.
    Safety(BankFault),
    /// Configuration is invalid or could not be parsed.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safety(e) => write!(f, "safety: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Bank faults
// ---------------------------------------------------------------------------

/// Which side of the charlieplex matrix a fault was detected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    Anode,
    Cathode,
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anode => write!(f, "anode"),
            Self::Cathode => write!(f, "cathode"),
        }
    }
}

/// Diagnostic payload for a tripped bank safety net.
///
/// `active` is the live-pin count the bookkeeping arrived at; anything other
/// than 0 or 1 means the scheduler lost track of what it energized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankFault {
    pub bank: Bank,
    pub pin: PinId,
    pub active: i8,
}

impl fmt::Display for BankFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bank has {} active pins after switching pin {}",
            self.bank, self.active, self.pin
        )
    }
}

impl From<BankFault> for Error {
    fn from(e: BankFault) -> Self {
        Self::Safety(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
