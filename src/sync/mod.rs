//! Synchronization primitives for state shared with the tick interrupt.
//!
//! The core is single and the only asynchronous actor is the interrupt
//! handler, so mutual exclusion is interrupt masking ([`IrqGuard`]). Data is
//! wrapped in an [`IrqMutex`], which can only be locked by someone holding a
//! guard.
//!
//! The handler takes an `IrqGuard` too. The guard records whether IRQs were
//! enabled and only unmasks them on drop if they were, so taking it with IRQs
//! already masked by the exception entry is a no-op pair rather than a
//! deadlock.

/// Run a block with IRQs masked.
#[macro_export]
macro_rules! irq_critical {
    ($body:block) => {{
        let _guard = $crate::IrqGuard::new();
        $body
    }};
}

mod irq;
mod irq_mutex;

pub use irq::{interrupts_masked, IrqGuard};
pub use irq_mutex::IrqMutex;
