//! Software model of the interrupt mask, for hosted builds and unit tests.
//!
//! There is no interrupt to mask on a host, so the mask is a flag. Under
//! `cfg(test)` and the `sim` feature the flag is per thread, standing in for
//! a per-core mask, so concurrently running tests never see each other's
//! critical sections.

pub mod interrupt;
pub mod misc;
