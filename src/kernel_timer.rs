//! One-shot kernel timers fired from the tick interrupt.
//!
//! A fixed table of `N` slots. Foreground code arms a slot with
//! [`KernelTimers::start`] and may cancel it; every tick the interrupt handler
//! runs [`KernelTimers::poll`], which fires the slots whose deadline has
//! passed. A slot is emptied before its callback runs, so the callback may
//! arm a new timer straight away, possibly in the same slot.
//!
//! Deadlines are compared with wrapping arithmetic, so a timer keeps working
//! across the 2^32 wrap of the tick counter as long as its delay stays below
//! 2^31 ticks.

use core::fmt;
use core::num::NonZeroU32;
use core::time::Duration;

use crate::config::HZ;
use crate::error::{Error, Result};
use crate::sync::{interrupts_masked, IrqGuard, IrqMutex};

/// Longest delay the signed deadline comparison can represent.
pub const MAX_DELAY_TICKS: u32 = i32::MAX as u32;

/// Names an armed kernel timer: slot index + 1.
///
/// Raw value 0 means "no timer" and has no `KernelTimerHandle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KernelTimerHandle(NonZeroU32);

impl KernelTimerHandle {
    /// Wraps a raw handle; `None` for the sentinel 0.
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index as u32))
    }

    /// Raw handle value, in `1..=N`.
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Slot index.
    pub const fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl fmt::Display for KernelTimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Callback of a kernel timer.
///
/// Runs in interrupt context with IRQs masked: it must be short and must not
/// block. `param` and `context` are the opaque words given at arming time.
pub type KernelTimerHandler<const N: usize> =
    fn(scope: &TimerScope<'_, N>, handle: KernelTimerHandle, param: usize, context: usize);

/// An armed slot.
#[derive(Clone, Copy)]
pub struct KernelTimer<const N: usize> {
    pub handler: KernelTimerHandler<N>,
    /// Tick at which the timer is due.
    pub elapses_at: u32,
    pub param: usize,
    pub context: usize,
}

impl<const N: usize> KernelTimer<N> {
    /// True once `now` has reached the deadline, modulo 2^32.
    #[inline]
    pub fn elapsed(&self, now: u32) -> bool {
        (self.elapses_at.wrapping_sub(now) as i32) <= 0
    }
}

impl<const N: usize> fmt::Debug for KernelTimer<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelTimer")
            .field("handler", &(self.handler as *const ()))
            .field("elapses_at", &self.elapses_at)
            .field("param", &format_args!("{:#x}", self.param))
            .field("context", &format_args!("{:#x}", self.context))
            .finish()
    }
}

/// The slot array. A slot is free iff it holds `None`.
#[derive(Debug)]
pub struct KernelTimerTable<const N: usize> {
    slots: [Option<KernelTimer<N>>; N],
}

impl<const N: usize> KernelTimerTable<N> {
    pub const fn new() -> Self {
        Self {
            slots: [const { None }; N],
        }
    }

    /// Put `timer` in the first free slot.
    pub fn allocate(&mut self, timer: KernelTimer<N>) -> Option<KernelTimerHandle> {
        let index = self.slots.iter().position(Option::is_none)?;
        self.slots[index] = Some(timer);
        Some(KernelTimerHandle::from_index(index))
    }

    /// Empty the slot of `handle`, armed or not.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is beyond the table.
    #[track_caller]
    pub fn clear(&mut self, handle: KernelTimerHandle) {
        assert!(
            handle.index() < N,
            "kernel timer handle {} out of range 1..={}",
            handle,
            N
        );
        self.slots[handle.index()] = None;
    }

    /// Empty slot `index` and return its timer if it is due at `now`.
    pub fn take_elapsed(&mut self, index: usize, now: u32) -> Option<KernelTimer<N>> {
        let slot = &mut self.slots[index];
        if slot.as_ref().is_some_and(|timer| timer.elapsed(now)) {
            slot.take()
        } else {
            None
        }
    }

    pub fn get(&self, handle: KernelTimerHandle) -> Option<&KernelTimer<N>> {
        self.slots.get(handle.index())?.as_ref()
    }

    /// Number of armed slots.
    pub fn armed(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

/// The timer table as shared between foreground code and the tick interrupt.
#[derive(Debug)]
pub struct KernelTimers<const N: usize> {
    table: IrqMutex<KernelTimerTable<N>>,
}

impl<const N: usize> KernelTimers<N> {
    pub const fn new() -> Self {
        Self {
            table: IrqMutex::new(KernelTimerTable::new()),
        }
    }

    /// Arm a timer due `delay` ticks after `now`.
    ///
    /// First free slot wins; there is no ordering by deadline and no check
    /// for duplicates.
    pub fn start(
        &self,
        guard: &IrqGuard,
        now: u32,
        delay: u32,
        handler: KernelTimerHandler<N>,
        param: usize,
        context: usize,
    ) -> Result<KernelTimerHandle> {
        if delay > MAX_DELAY_TICKS {
            return Err(Error::DelayOutOfRange {
                delay: delay as u64,
            });
        }

        let timer = KernelTimer {
            handler,
            elapses_at: now.wrapping_add(delay),
            param,
            context,
        };
        let handle = self
            .table
            .lock(guard)
            .allocate(timer)
            .ok_or(Error::Exhausted)?;

        trace!(
            "kernel timer {} armed at tick {} for {} ticks",
            handle, now, delay
        );
        Ok(handle)
    }

    /// Disarm `handle`. Harmless if it already fired or was cancelled.
    #[track_caller]
    pub fn cancel(&self, guard: &IrqGuard, handle: KernelTimerHandle) {
        self.table.lock(guard).clear(handle);
    }

    /// Fire every timer due at `now`, in slot order. Tick interrupt only.
    ///
    /// The table lock is dropped around each callback; the guard is not, so
    /// callbacks run with IRQs masked. Returns the number of callbacks run.
    pub fn poll(&self, guard: &IrqGuard, now: u32) -> usize {
        debug_assert!(interrupts_masked());

        let mut fired = 0;
        for index in 0..N {
            let expired = self.table.lock(guard).take_elapsed(index, now);
            if let Some(timer) = expired {
                let handle = KernelTimerHandle::from_index(index);
                trace!("kernel timer {} fired at tick {}", handle, now);

                let scope = TimerScope {
                    timers: self,
                    guard,
                    now,
                };
                (timer.handler)(&scope, handle, timer.param, timer.context);
                fired += 1;
            }
        }
        fired
    }

    /// Number of armed timers.
    pub fn armed(&self, guard: &IrqGuard) -> usize {
        self.table.lock(guard).armed()
    }

    pub fn is_armed(&self, guard: &IrqGuard, handle: KernelTimerHandle) -> bool {
        self.table.lock(guard).get(handle).is_some()
    }

    /// Tick at which `handle` is due, if armed.
    pub fn deadline(&self, guard: &IrqGuard, handle: KernelTimerHandle) -> Option<u32> {
        self.table.lock(guard).get(handle).map(|timer| timer.elapses_at)
    }
}

/// What a timer callback may do to the timer table.
///
/// Handed to each callback by [`KernelTimers::poll`]; it reuses the guard the
/// interrupt handler already holds.
pub struct TimerScope<'a, const N: usize> {
    timers: &'a KernelTimers<N>,
    guard: &'a IrqGuard,
    now: u32,
}

impl<const N: usize> TimerScope<'_, N> {
    /// The tick being processed.
    pub fn now(&self) -> u32 {
        self.now
    }

    /// Arm a timer due `delay` ticks after the current tick. A zero delay
    /// into a slot after the current one fires during this same poll.
    pub fn start_kernel_timer(
        &self,
        delay: u32,
        handler: KernelTimerHandler<N>,
        param: usize,
        context: usize,
    ) -> Result<KernelTimerHandle> {
        self.timers
            .start(self.guard, self.now, delay, handler, param, context)
            .inspect_err(report_start_failure)
    }

    #[track_caller]
    pub fn cancel_kernel_timer(&self, handle: KernelTimerHandle) {
        self.timers.cancel(self.guard, handle);
    }

    pub fn is_armed(&self, handle: KernelTimerHandle) -> bool {
        self.timers.is_armed(self.guard, handle)
    }
}

/// Log why arming a timer failed. Call with the guard released where there
/// is one to release.
pub(crate) fn report_start_failure(error: &Error) {
    warn!("{}", error);
}

/// Convert a delay to ticks, rounding up so the timer never fires early.
pub fn ticks_from_duration(delay: Duration) -> Result<u32> {
    let ticks = delay
        .as_nanos()
        .saturating_mul(HZ as u128)
        .div_ceil(1_000_000_000);

    if ticks > MAX_DELAY_TICKS as u128 {
        return Err(Error::DelayOutOfRange {
            delay: u64::try_from(ticks).unwrap_or(u64::MAX),
        });
    }
    Ok(ticks as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Mutex;

    const N: usize = 4;

    type Timers = KernelTimers<N>;

    fn word<T>(value: &T) -> usize {
        value as *const T as usize
    }

    /// `param` points at an `AtomicUsize` to bump.
    fn bump(_: &TimerScope<'_, N>, _: KernelTimerHandle, param: usize, _: usize) {
        let counter = unsafe { &*(param as *const AtomicUsize) };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    /// `context` points at a `Mutex<Vec<usize>>` that collects `param`.
    fn record(_: &TimerScope<'_, N>, _: KernelTimerHandle, param: usize, context: usize) {
        let log = unsafe { &*(context as *const Mutex<Vec<usize>>) };
        log.lock().unwrap().push(param);
    }

    fn start(timers: &Timers, now: u32, delay: u32, param: usize) -> Result<KernelTimerHandle> {
        let guard = IrqGuard::new();
        timers.start(&guard, now, delay, bump, param, 0)
    }

    fn poll(timers: &Timers, now: u32) -> usize {
        let guard = IrqGuard::new();
        timers.poll(&guard, now)
    }

    #[test]
    fn test_handle_sentinel() {
        assert_eq!(KernelTimerHandle::new(0), None);
        let handle = KernelTimerHandle::new(3).unwrap();
        assert_eq!(handle.get(), 3);
        assert_eq!(handle.index(), 2);
        assert_eq!(handle.to_string(), "#3");
    }

    #[test]
    fn test_capacity() {
        let timers = Timers::new();
        let counter = AtomicUsize::new(0);

        let mut handles: Vec<u32> = (0..N)
            .map(|_| start(&timers, 0, 10, word(&counter)).unwrap().get())
            .collect();
        handles.sort_unstable();
        assert_eq!(handles, (1..=N as u32).collect::<Vec<_>>());

        assert_eq!(start(&timers, 0, 10, word(&counter)), Err(Error::Exhausted));

        // Firing frees the slots again
        assert_eq!(poll(&timers, 10), N);
        assert_eq!(counter.load(Ordering::SeqCst), N);
        assert!(start(&timers, 10, 1, word(&counter)).is_ok());
    }

    #[test]
    fn test_cancel_frees_slot() {
        let timers = Timers::new();
        let counter = AtomicUsize::new(0);
        let handles: Vec<_> = (0..N)
            .map(|_| start(&timers, 0, 5, word(&counter)).unwrap())
            .collect();

        let guard = IrqGuard::new();
        timers.cancel(&guard, handles[2]);
        assert!(!timers.is_armed(&guard, handles[2]));
        drop(guard);

        let reused = start(&timers, 0, 5, word(&counter)).unwrap();
        assert_eq!(reused, handles[2]);
        assert_eq!(start(&timers, 0, 5, word(&counter)), Err(Error::Exhausted));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let timers = Timers::new();
        let counter = AtomicUsize::new(0);
        let handle = start(&timers, 0, 1, word(&counter)).unwrap();

        let guard = IrqGuard::new();
        timers.cancel(&guard, handle);
        timers.cancel(&guard, handle);
        assert_eq!(timers.armed(&guard), 0);
        assert_eq!(timers.poll(&guard, 1), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_cancel_out_of_range() {
        let timers = Timers::new();
        let guard = IrqGuard::new();
        timers.cancel(&guard, KernelTimerHandle::new(N as u32 + 1).unwrap());
    }

    #[test]
    fn test_never_fires_early() {
        let timers = Timers::new();
        let counter = AtomicUsize::new(0);
        let handle = start(&timers, 0, 250, word(&counter)).unwrap();

        for now in 1..250 {
            assert_eq!(poll(&timers, now), 0, "fired at tick {}", now);
        }
        let guard = IrqGuard::new();
        assert_eq!(timers.deadline(&guard, handle), Some(250));
        drop(guard);

        assert_eq!(poll(&timers, 250), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(poll(&timers, 251), 0);
    }

    #[test]
    fn test_late_poll_still_fires() {
        let timers = Timers::new();
        let counter = AtomicUsize::new(0);
        start(&timers, 100, 3, word(&counter)).unwrap();

        assert_eq!(poll(&timers, 110), 1);
    }

    #[test]
    fn test_zero_delay_fires_on_next_poll() {
        let timers = Timers::new();
        let counter = AtomicUsize::new(0);
        start(&timers, 7, 0, word(&counter)).unwrap();

        assert_eq!(poll(&timers, 7), 1);
    }

    #[test]
    fn test_deadline_across_wrap() {
        let timers = Timers::new();
        let counter = AtomicUsize::new(0);
        let now = u32::MAX - 5;
        start(&timers, now, 10, word(&counter)).unwrap();

        assert_eq!(poll(&timers, u32::MAX), 0);
        assert_eq!(poll(&timers, 0), 0);
        assert_eq!(poll(&timers, 3), 0);
        assert_eq!(poll(&timers, 4), 1);
    }

    #[test]
    fn test_delay_window() {
        let timers = Timers::new();
        let counter = AtomicUsize::new(0);

        assert_eq!(
            start(&timers, 0, MAX_DELAY_TICKS + 1, word(&counter)),
            Err(Error::DelayOutOfRange {
                delay: MAX_DELAY_TICKS as u64 + 1
            })
        );

        start(&timers, 0, MAX_DELAY_TICKS, word(&counter)).unwrap();
        assert_eq!(poll(&timers, 1), 0);
        assert_eq!(poll(&timers, MAX_DELAY_TICKS - 1), 0);
        assert_eq!(poll(&timers, MAX_DELAY_TICKS), 1);
    }

    #[test]
    fn test_poll_in_slot_order() {
        let timers = Timers::new();
        let order = Mutex::new(Vec::<usize>::new());
        let guard = IrqGuard::new();

        let a = timers.start(&guard, 0, 5, record, 0xA, word(&order)).unwrap();
        timers.start(&guard, 0, 3, record, 0xB, word(&order)).unwrap();
        timers.start(&guard, 0, 5, record, 0xC, word(&order)).unwrap();
        timers.cancel(&guard, a);
        let d = timers.start(&guard, 0, 5, record, 0xD, word(&order)).unwrap();
        assert_eq!(d, a);

        assert_eq!(timers.poll(&guard, 5), 3);
        assert_eq!(*order.lock().unwrap(), vec![0xD, 0xB, 0xC]);
    }

    fn check_cleared(scope: &TimerScope<'_, N>, handle: KernelTimerHandle, param: usize, _: usize) {
        let armed = unsafe { &*(param as *const AtomicUsize) };
        armed.store(scope.is_armed(handle) as usize + 1, Ordering::SeqCst);
    }

    #[test]
    fn test_slot_cleared_before_callback() {
        let timers = Timers::new();
        let armed = AtomicUsize::new(0);
        let guard = IrqGuard::new();
        timers
            .start(&guard, 0, 1, check_cleared, word(&armed), 0)
            .unwrap();

        timers.poll(&guard, 1);
        // 1 + false
        assert_eq!(armed.load(Ordering::SeqCst), 1);
    }

    /// Re-arms itself once; `context` receives the new raw handle.
    fn rearm(scope: &TimerScope<'_, N>, _: KernelTimerHandle, param: usize, context: usize) {
        let counter = unsafe { &*(param as *const AtomicUsize) };
        let rearmed = unsafe { &*(context as *const AtomicU32) };
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            let handle = scope.start_kernel_timer(5, rearm, param, context).unwrap();
            rearmed.store(handle.get(), Ordering::SeqCst);
        }
    }

    #[test]
    fn test_callback_rearms_same_slot() {
        let timers = Timers::new();
        let counter = AtomicUsize::new(0);
        let rearmed = AtomicU32::new(0);
        let guard = IrqGuard::new();

        let handle = timers
            .start(&guard, 0, 2, rearm, word(&counter), word(&rearmed))
            .unwrap();

        assert_eq!(timers.poll(&guard, 2), 1);
        assert_eq!(rearmed.load(Ordering::SeqCst), handle.get());
        assert_eq!(timers.deadline(&guard, handle), Some(7));

        for now in 3..7 {
            assert_eq!(timers.poll(&guard, now), 0);
        }
        assert_eq!(timers.poll(&guard, 7), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(timers.armed(&guard), 0);
    }

    /// Cancels the handle in `context`.
    fn cancel_other(scope: &TimerScope<'_, N>, _: KernelTimerHandle, _: usize, context: usize) {
        scope.cancel_kernel_timer(KernelTimerHandle::new(context as u32).unwrap());
    }

    #[test]
    fn test_callback_cancels_later_slot() {
        let timers = Timers::new();
        let counter = AtomicUsize::new(0);
        let guard = IrqGuard::new();

        // Slot 0 cancels slot 1 before the scan reaches it
        timers.start(&guard, 0, 1, cancel_other, 0, 2).unwrap();
        timers.start(&guard, 0, 1, bump, word(&counter), 0).unwrap();

        assert_eq!(timers.poll(&guard, 1), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(timers.armed(&guard), 0);
    }

    #[test]
    fn test_ticks_from_duration() {
        assert_eq!(ticks_from_duration(Duration::ZERO), Ok(0));
        assert_eq!(ticks_from_duration(Duration::from_secs(1)), Ok(HZ));
        assert_eq!(ticks_from_duration(Duration::from_nanos(1)), Ok(1));
        assert_eq!(ticks_from_duration(Duration::from_secs(3) + Duration::from_nanos(1)), Ok(3 * HZ + 1));
        assert!(matches!(
            ticks_from_duration(Duration::from_secs(u64::MAX)),
            Err(Error::DelayOutOfRange { .. })
        ));
    }

    /// Small deterministic generator for the interleaving test.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u32 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.0 >> 33) as u32
        }
    }

    /// `context` points at a `Mutex<Vec<u32>>` collecting fired handles.
    fn collect(_: &TimerScope<'_, N>, handle: KernelTimerHandle, _: usize, context: usize) {
        let log = unsafe { &*(context as *const Mutex<Vec<u32>>) };
        log.lock().unwrap().push(handle.get());
    }

    #[test]
    fn test_random_interleaving() {
        for seed in 0..16 {
            let timers = Timers::new();
            let fired = Mutex::new(Vec::<u32>::new());
            // handle -> deadline
            let mut model: HashMap<u32, u32> = HashMap::new();
            let mut rng = Lcg(seed);
            // Start near the wrap so deadlines cross it
            let mut now = u32::MAX - 200;

            for _ in 0..2000 {
                let guard = IrqGuard::new();
                match rng.next() % 4 {
                    0 | 1 => {
                        let delay = rng.next() % 40;
                        match timers.start(&guard, now, delay, collect, 0, word(&fired)) {
                            Ok(handle) => {
                                assert!(
                                    model.insert(handle.get(), now.wrapping_add(delay)).is_none(),
                                    "duplicate live handle {}",
                                    handle
                                );
                            }
                            Err(error) => {
                                assert_eq!(error, Error::Exhausted);
                                assert_eq!(model.len(), N);
                            }
                        }
                    }
                    2 => {
                        let raw = rng.next() % N as u32 + 1;
                        timers.cancel(&guard, KernelTimerHandle::new(raw).unwrap());
                        model.remove(&raw);
                    }
                    _ => {
                        now = now.wrapping_add(1);
                        let mut due: Vec<u32> = model
                            .iter()
                            .filter(|&(_, &at)| (at.wrapping_sub(now) as i32) <= 0)
                            .map(|(&handle, _)| handle)
                            .collect();
                        due.sort_unstable();
                        model.retain(|handle, _| !due.contains(handle));

                        assert_eq!(timers.poll(&guard, now), due.len());
                        assert_eq!(std::mem::take(&mut *fired.lock().unwrap()), due);
                    }
                }

                assert_eq!(timers.armed(&guard), model.len());
                for raw in 1..=N as u32 {
                    let handle = KernelTimerHandle::new(raw).unwrap();
                    assert_eq!(timers.is_armed(&guard, handle), model.contains_key(&raw));
                    assert_eq!(timers.deadline(&guard, handle), model.get(&raw).copied());
                }
            }
        }
    }
}
