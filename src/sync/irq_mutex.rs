use core::fmt;

use spin::{Mutex as SpinMutex, MutexGuard as SpinMutexGuard};

use super::IrqGuard;

/// Data shared between foreground code and the interrupt handler.
///
/// Locking requires an [`IrqGuard`], so the lock is only ever held with IRQs
/// masked. On a single core that leaves re-entrance as the only way to find
/// it taken, and re-entrance is a bug: `lock` panics instead of spinning
/// forever.
pub struct IrqMutex<T: ?Sized> {
    inner: SpinMutex<T>,
}

impl<T> IrqMutex<T> {
    pub const fn new(user_data: T) -> Self {
        IrqMutex {
            inner: SpinMutex::new(user_data),
        }
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: ?Sized> IrqMutex<T> {
    /// Locks the data for as long as `guard` keeps IRQs masked.
    ///
    /// # Panics
    ///
    /// Panics if the lock is already held, i.e. on re-entrance.
    #[track_caller]
    pub fn lock<'a>(&'a self, _guard: &'a IrqGuard) -> SpinMutexGuard<'a, T> {
        match self.inner.try_lock() {
            Some(guard) => guard,
            None => panic!("IrqMutex re-entered while locked"),
        }
    }

    /// Mutable access without locking; exclusivity is proven by `&mut self`.
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    /// Returns true if the lock is currently held.
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for IrqMutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_lock() {
            Some(guard) => write!(f, "IrqMutex {{ data: {:?} }}", &*guard),
            None => write!(f, "IrqMutex {{ <locked> }}"),
        }
    }
}
