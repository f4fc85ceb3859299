//! Host miscellaneous utilities

use core::sync::atomic::{fence, Ordering};

/// Memory barrier
#[inline(always)]
pub fn memory_barrier() {
    fence(Ordering::SeqCst);
}
