//! # ARMv7-A Architecture Support
//!
//! Covers the Raspberry Pi 2 and other 32-bit BCM283x boards.

pub mod interrupt;
pub mod misc;
