//! # AArch64 Architecture Support

pub mod interrupt;
pub mod misc;
