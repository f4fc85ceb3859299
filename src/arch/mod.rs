//! Architecture support: memory barriers and IRQ masking.
//!
//! Bare-metal ARM targets get the real instructions. Everything else, which
//! includes unit tests on any host, gets a software model.

#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub mod aarch64;
#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub use self::aarch64::*;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod armv7;
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use self::armv7::*;

#[cfg(not(all(any(target_arch = "aarch64", target_arch = "arm"), target_os = "none")))]
pub mod host;
#[cfg(not(all(any(target_arch = "aarch64", target_arch = "arm"), target_os = "none")))]
pub use self::host::*;
