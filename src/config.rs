//! Build-time configuration.
//!
//! The values come from `config.toml` at the crate root and are turned into
//! constants by `build.rs`.

include!(concat!(env!("OUT_DIR"), "/config.rs"));

/// Compare-match interval, in counter cycles, between two ticks.
pub const TICK_PERIOD: u32 = CLOCK_HZ / HZ;

const _: () = assert!(TICK_PERIOD > 0);
const _: () = assert!(KERNEL_TIMERS > 0 && KERNEL_TIMERS <= u32::MAX as usize);
