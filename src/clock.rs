//! Fenced reads of the free-running hardware counter.

use crate::arch::misc::memory_barrier;
use crate::devices::SystemTimer;

/// Read the counter, with a data memory barrier on both sides so the access
/// is ordered against surrounding peripheral accesses.
///
/// Needs no locking and may be called from any context.
#[inline]
pub fn read_ticks<T: SystemTimer + ?Sized>(hardware: &T) -> u32 {
    memory_barrier();
    let ticks = hardware.counter();
    memory_barrier();
    ticks
}

/// Counter cycles since `start`, correct across one wrap of the counter.
#[inline]
pub fn elapsed_since<T: SystemTimer + ?Sized>(hardware: &T, start: u32) -> u32 {
    read_ticks(hardware).wrapping_sub(start)
}
