//! Busy-wait delays on the hardware counter.
//!
//! These spin on the free-running counter and never look at the tick count,
//! so they work before [`TimerContext::initialize`](crate::TimerContext) and
//! with IRQs masked.

use core::hint::spin_loop;

use crate::clock::read_ticks;
use crate::config::CLOCK_HZ;
use crate::devices::SystemTimer;

/// Counter cycles covering `amount` units of `1 / per_second` seconds,
/// rounded up and saturated at the longest wait the counter can express.
fn cycles(amount: u32, per_second: u64) -> u32 {
    let cycles = u64::from(amount)
        .checked_mul(u64::from(CLOCK_HZ))
        .map(|cycles| cycles.div_ceil(per_second))
        .unwrap_or(u64::MAX);
    u32::try_from(cycles).unwrap_or(u32::MAX)
}

fn spin_cycles<T: SystemTimer + ?Sized>(hardware: &T, cycles: u32) {
    if cycles == 0 {
        return;
    }
    // Summed per read, so a read that jumps past the wrap point of a long
    // wait still counts.
    let mut last = read_ticks(hardware);
    let mut waited: u64 = 0;
    while waited < u64::from(cycles) {
        spin_loop();
        let now = read_ticks(hardware);
        waited += u64::from(now.wrapping_sub(last));
        last = now;
    }
}

/// Spin for at least `us` microseconds.
pub fn spin_us<T: SystemTimer + ?Sized>(hardware: &T, us: u32) {
    spin_cycles(hardware, cycles(us, 1_000_000));
}

/// Spin for at least `ms` milliseconds.
pub fn spin_ms<T: SystemTimer + ?Sized>(hardware: &T, ms: u32) {
    spin_cycles(hardware, cycles(ms, 1_000));
}
