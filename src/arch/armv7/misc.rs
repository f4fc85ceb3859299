//! ARMv7 miscellaneous utilities

/// Memory barrier
#[inline(always)]
pub fn memory_barrier() {
    unsafe {
        core::arch::asm!("dmb", options(nostack, preserves_flags));
    }
}
