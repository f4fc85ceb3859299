//! In-memory model of the system timer.
//!
//! The counter only moves when told to: explicitly through
//! [`SimulatedSystemTimer::advance`], or by `step` cycles on every
//! [`SystemTimer::counter`] read so that spin loops terminate. Crossing a
//! compare value raises its match bit, as the hardware does.

use core::sync::atomic::{AtomicU32, Ordering};

use super::{Channel, Status, SystemTimer};

#[derive(Debug)]
pub struct SimulatedSystemTimer {
    counter: AtomicU32,
    step: AtomicU32,
    compare: [AtomicU32; Channel::COUNT],
    status: AtomicU32,
    reads: AtomicU32,
}

impl SimulatedSystemTimer {
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// A timer whose counter starts at `counter`, e.g. just below the wrap.
    pub const fn starting_at(counter: u32) -> Self {
        Self {
            counter: AtomicU32::new(counter),
            step: AtomicU32::new(0),
            compare: [const { AtomicU32::new(0) }; Channel::COUNT],
            status: AtomicU32::new(0),
            reads: AtomicU32::new(0),
        }
    }

    /// Advance the counter by `step` cycles on every `counter()` read.
    pub fn set_step(&self, step: u32) {
        self.step.store(step, Ordering::Relaxed);
    }

    /// Move the counter forward and raise the match bit of every channel
    /// whose compare value was passed. Returns the new counter value.
    pub fn advance(&self, cycles: u32) -> u32 {
        let old = self.counter.fetch_add(cycles, Ordering::SeqCst);
        let new = old.wrapping_add(cycles);
        for (index, compare) in self.compare.iter().enumerate() {
            // Distance from the old counter to the compare value, in 1..=cycles
            let distance = compare.load(Ordering::SeqCst).wrapping_sub(old);
            if distance != 0 && distance <= cycles {
                self.status.fetch_or(1 << index, Ordering::SeqCst);
            }
        }
        new
    }

    /// Counter value without side effects.
    pub fn now(&self) -> u32 {
        self.counter.load(Ordering::SeqCst)
    }

    /// Cycles left until `channel` matches.
    pub fn until_match(&self, channel: Channel) -> u32 {
        self.compare(channel).wrapping_sub(self.now())
    }

    /// Raise a match bit without moving the counter.
    pub fn raise(&self, matched: Status) {
        self.status.fetch_or(matched.bits(), Ordering::SeqCst);
    }

    /// Last value programmed into `channel`.
    pub fn compare(&self, channel: Channel) -> u32 {
        self.compare[channel.index()].load(Ordering::SeqCst)
    }

    /// Number of `counter()` reads so far.
    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::Relaxed)
    }
}

impl Default for SimulatedSystemTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemTimer for SimulatedSystemTimer {
    fn counter(&self) -> u32 {
        self.reads.fetch_add(1, Ordering::Relaxed);
        match self.step.load(Ordering::Relaxed) {
            0 => self.now(),
            step => self.advance(step),
        }
    }

    fn set_compare(&self, channel: Channel, value: u32) {
        self.compare[channel.index()].store(value, Ordering::SeqCst);
    }

    fn status(&self) -> Status {
        Status::from_bits_truncate(self.status.load(Ordering::SeqCst))
    }

    fn acknowledge(&self, matched: Status) {
        self.status.fetch_and(!matched.bits(), Ordering::SeqCst);
    }
}
