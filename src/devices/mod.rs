//! Hardware surface of the system timer.
//!
//! The tick layer only needs four operations on the timer block, collected
//! in [`SystemTimer`]. [`bcm2835_systimer`] drives the real registers;
//! [`sim`] is an in-memory model for host builds.

use crate::config;
use crate::interrupt::Interrupt;

pub mod bcm2835_systimer;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use bcm2835_systimer::Bcm2835SystemTimer;

bitflags! {
    /// Match bits of the control/status register (`CS`).
    ///
    /// A bit is set by hardware when the counter reaches the matching compare
    /// register and cleared by writing 1 to it.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Status: u32 {
        const M0 = 1 << 0;
        const M1 = 1 << 1;
        const M2 = 1 << 2;
        const M3 = 1 << 3;
    }
}

/// A compare channel, `C0` through `C3`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Channel {
    C0 = 0,
    C1 = 1,
    C2 = 2,
    C3 = 3,
}

impl Channel {
    /// Number of compare channels in the block.
    pub const COUNT: usize = 4;

    /// The channel selected in `config.toml`.
    pub const CONFIGURED: Channel = match Channel::new(config::TIMER_CHANNEL) {
        Some(channel) => channel,
        None => panic!("timer.channel out of range"),
    };

    pub const fn new(index: u8) -> Option<Self> {
        match index {
            0 => Some(Channel::C0),
            1 => Some(Channel::C1),
            2 => Some(Channel::C2),
            3 => Some(Channel::C3),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// The `CS` bit raised when this channel matches.
    pub const fn status(self) -> Status {
        Status::from_bits_retain(1 << self as u32)
    }

    /// The interrupt line this channel raises.
    pub const fn interrupt(self) -> Interrupt {
        match self {
            Channel::C0 => Interrupt::Timer0,
            Channel::C1 => Interrupt::Timer1,
            Channel::C2 => Interrupt::Timer2,
            Channel::C3 => Interrupt::Timer3,
        }
    }
}

/// Register-level access to a free-running counter with compare channels.
///
/// Implementations are shared between foreground code and the interrupt
/// handler, hence `&self` everywhere.
pub trait SystemTimer {
    /// Low word of the free-running counter (`CLO`).
    fn counter(&self) -> u32;

    /// Program the compare register of `channel`.
    fn set_compare(&self, channel: Channel, value: u32);

    /// Current match bits (`CS`).
    fn status(&self) -> Status;

    /// Clear the given match bits (write-1-to-clear).
    fn acknowledge(&self, matched: Status);
}
