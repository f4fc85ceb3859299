//! AArch64 miscellaneous utilities

/// Data memory barrier, full system.
#[inline(always)]
pub fn memory_barrier() {
    unsafe {
        core::arch::asm!("dmb sy", options(nostack, preserves_flags));
    }
}
