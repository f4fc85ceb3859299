//! Host IRQ "masking"

#[cfg(not(any(test, feature = "sim")))]
mod flag {
    use core::sync::atomic::{AtomicBool, Ordering};

    static MASKED: AtomicBool = AtomicBool::new(false);

    pub fn get() -> bool {
        MASKED.load(Ordering::Relaxed)
    }

    pub fn set(masked: bool) {
        MASKED.store(masked, Ordering::Relaxed);
    }
}

#[cfg(any(test, feature = "sim"))]
mod flag {
    use std::cell::Cell;

    std::thread_local! {
        static MASKED: Cell<bool> = const { Cell::new(false) };
    }

    pub fn get() -> bool {
        MASKED.with(Cell::get)
    }

    pub fn set(masked: bool) {
        MASKED.with(|m| m.set(masked));
    }
}

/// Returns true if IRQs are currently unmasked.
#[inline(always)]
pub fn enabled() -> bool {
    !flag::get()
}

/// Mask IRQs.
///
/// # Safety
///
/// The caller is responsible for unmasking them again.
#[inline(always)]
pub unsafe fn disable() {
    flag::set(true);
    core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
}

/// Unmask IRQs.
///
/// # Safety
///
/// Mirrors the hardware backends; nothing can be taken here.
#[inline(always)]
pub unsafe fn enable() {
    core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
    flag::set(false);
}
