//! ARMv7 IRQ masking through the `CPSR.I` bit

use core::arch::asm;

const CPSR_I: u32 = 1 << 7;

/// Returns true if IRQs are currently unmasked.
#[inline(always)]
pub fn enabled() -> bool {
    let cpsr: u32;
    unsafe {
        asm!("mrs {}, cpsr", out(reg) cpsr, options(nomem, nostack, preserves_flags));
    }
    cpsr & CPSR_I == 0
}

/// Mask IRQs.
///
/// # Safety
///
/// The caller is responsible for unmasking them again.
#[inline(always)]
pub unsafe fn disable() {
    unsafe {
        asm!("cpsid i", options(nostack, preserves_flags));
    }
}

/// Unmask IRQs.
///
/// # Safety
///
/// A pending interrupt may be taken immediately.
#[inline(always)]
pub unsafe fn enable() {
    unsafe {
        asm!("cpsie i", options(nostack, preserves_flags));
    }
}
