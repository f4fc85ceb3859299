//! AArch64 IRQ masking through `DAIF`

use core::arch::asm;

/// `DAIF.I`, set while IRQs are masked.
const DAIF_I: u64 = 1 << 7;

/// Returns true if IRQs are currently unmasked.
#[inline(always)]
pub fn enabled() -> bool {
    let daif: u64;
    unsafe {
        asm!("mrs {}, daif", out(reg) daif, options(nomem, nostack, preserves_flags));
    }
    daif & DAIF_I == 0
}

/// Mask IRQs.
///
/// # Safety
///
/// The caller is responsible for unmasking them again.
#[inline(always)]
pub unsafe fn disable() {
    unsafe {
        asm!("msr daifset, #2", options(nostack, preserves_flags));
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
        asm!("msr daifclr, #2", options(nostack, preserves_flags));
    }
}
