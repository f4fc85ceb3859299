//! Interface to the interrupt controller.
//!
//! Routing IRQ lines to handlers belongs to the kernel; the tick layer only
//! asks for its line to be connected.

/// Interrupt lines of the system timer on the BCM283x controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Interrupt {
    Timer0 = 0,
    Timer1 = 1,
    Timer2 = 2,
    Timer3 = 3,
}

impl Interrupt {
    /// Line number on the interrupt controller.
    pub const fn irq(self) -> u32 {
        self as u32
    }
}

/// Something that services an interrupt line.
///
/// Called from IRQ context with IRQs masked.
pub trait InterruptHandler: Sync {
    fn handle_interrupt(&self);
}

/// The kernel's interrupt controller, as seen from a driver.
pub trait InterruptController {
    /// Route `irq` to `handler` and unmask the line.
    fn connect(&mut self, irq: Interrupt, handler: &'static dyn InterruptHandler);
}
