use core::marker::PhantomData;

use crate::arch::interrupt;

/// RAII guard for an IRQ-masked critical section
///
/// Masks IRQs on creation and restores the previous mask state when dropped.
/// Guards nest; they must be dropped in reverse order of creation, which
/// scoping gives for free.
pub struct IrqGuard {
    /// Whether IRQs were unmasked when this guard was taken.
    was_enabled: bool,
    /// The mask is a property of the current core.
    _not_send: PhantomData<*const ()>,
}

impl IrqGuard {
    /// Mask IRQs until the returned guard is dropped.
    #[inline(always)]
    pub fn new() -> Self {
        let was_enabled = interrupt::enabled();
        if was_enabled {
            unsafe { interrupt::disable() };
        }
        Self {
            was_enabled,
            _not_send: PhantomData,
        }
    }

    /// Returns true if IRQs were already masked when this guard was taken,
    /// which is always the case inside the interrupt handler.
    #[inline]
    pub fn is_nested(&self) -> bool {
        !self.was_enabled
    }
}

impl Drop for IrqGuard {
    #[inline(always)]
    fn drop(&mut self) {
        if self.was_enabled {
            unsafe { interrupt::enable() };
        }
    }
}

impl Default for IrqGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns true if IRQs are masked on this core.
#[inline]
pub fn interrupts_masked() -> bool {
    !interrupt::enabled()
}
