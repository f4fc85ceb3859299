//! Recoverable errors reported by the timer API.
//!
//! Contract violations (a handle outside the table, a tick interrupt without
//! its match bit, re-entering a locked critical section) are not errors; they
//! panic.

use core::fmt;

/// Errors returned by the timer API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// Every kernel timer slot is armed.
    Exhausted,
    /// The delay does not fit the wraparound-safe comparison window.
    DelayOutOfRange {
        /// Requested delay, in ticks (saturated for `Duration` requests).
        delay: u64,
    },
    /// `TimerContext::initialize` was called a second time.
    AlreadyInitialized,
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

impl Error {
    /// Short description, stable for log lines.
    pub fn text(&self) -> &'static str {
        match self {
            Error::Exhausted => "System limit of kernel timers exceeded",
            Error::DelayOutOfRange { .. } => "Kernel timer delay out of range",
            Error::AlreadyInitialized => "Timer already initialized",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DelayOutOfRange { delay } => {
                write!(f, "{} ({} ticks)", self.text(), delay)
            }
            _ => f.write_str(self.text()),
        }
    }
}

impl core::error::Error for Error {}
