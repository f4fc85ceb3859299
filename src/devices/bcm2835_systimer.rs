//! # BCM2835 System Timer Driver
//!
//! A 64-bit counter running at 1 MHz with four 32-bit compare registers.
//! Channels 0 and 2 belong to the VideoCore firmware.

use core::ptr;

use super::{Channel, Status, SystemTimer};
use crate::config;

const CS: usize = 0x00;
const CLO: usize = 0x04;
const CHI: usize = 0x08;
const C0: usize = 0x0C;

pub struct Bcm2835SystemTimer {
    base: usize,
}

impl Bcm2835SystemTimer {
    /// # Safety
    ///
    /// `base` must map the system timer register block, and nobody else may
    /// program the compare channel used by the tick layer.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// The block at the address configured in `config.toml`.
    ///
    /// # Safety
    ///
    /// Same as [`Bcm2835SystemTimer::new`].
    pub const unsafe fn configured() -> Self {
        unsafe { Self::new(config::SYSTIMER_BASE) }
    }

    fn read(&self, offset: usize) -> u32 {
        unsafe { ptr::read_volatile((self.base + offset) as *const u32) }
    }

    fn write(&self, offset: usize, value: u32) {
        unsafe { ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }

    /// Full 64-bit counter.
    pub fn counter64(&self) -> u64 {
        // Re-read if the high word moved underneath us
        loop {
            let hi1 = self.read(CHI);
            let lo = self.read(CLO);
            let hi2 = self.read(CHI);

            if hi1 == hi2 {
                return ((hi1 as u64) << 32) | (lo as u64);
            }
        }
    }

    /// Current value of a compare register.
    pub fn compare(&self, channel: Channel) -> u32 {
        self.read(C0 + channel.index() * 4)
    }
}

impl SystemTimer for Bcm2835SystemTimer {
    fn counter(&self) -> u32 {
        self.read(CLO)
    }

    fn set_compare(&self, channel: Channel, value: u32) {
        self.write(C0 + channel.index() * 4, value);
    }

    fn status(&self) -> Status {
        Status::from_bits_truncate(self.read(CS))
    }

    fn acknowledge(&self, matched: Status) {
        self.write(CS, matched.bits());
    }
}
