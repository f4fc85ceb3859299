//! # ktimer
//!
//! Tick and kernel-timer layer for the BCM283x system timer. One compare
//! channel of the free-running counter raises a periodic interrupt; every
//! interrupt advances a tick counter and fires the one-shot kernel timers
//! whose deadline has passed. Nothing here allocates.
//!
//! The whole state lives in a [`TimerContext`], which the kernel places in a
//! `static` and hands to the interrupt controller during boot.

#![allow(clippy::new_without_default)]
#![allow(clippy::identity_op)]

// Strict safety enforcement
#![deny(clippy::not_unsafe_ptr_arg_deref)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![deny(static_mut_refs)]
#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

#![cfg_attr(not(test), no_std)]

// The hosted interrupt model keeps its mask in thread-local storage.
#[cfg(all(feature = "sim", not(test), not(target_os = "none")))]
extern crate std;

#[macro_use]
extern crate bitflags;

#[macro_use]
extern crate log;

#[macro_use]
pub mod sync;

pub mod arch;
pub mod clock;
pub mod config;
pub mod delay;
pub mod devices;
pub mod error;
pub mod interrupt;
pub mod kernel_timer;
pub mod logger;
pub mod tick;
pub mod timer;

pub use crate::error::{Error, Result};
pub use crate::kernel_timer::{KernelTimerHandle, KernelTimerHandler, TimerScope};
pub use crate::sync::{IrqGuard, IrqMutex};
pub use crate::tick::TimeStamp;
pub use crate::timer::TimerContext;
