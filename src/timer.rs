//! The tick interrupt and the timer API built on it.
//!
//! A [`TimerContext`] owns the hardware timer, the tick counters and the
//! kernel timer table. The kernel creates exactly one, usually in a `static`,
//! calls [`TimerContext::initialize`] once during boot and then shares it by
//! reference.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use arrayvec::ArrayString;

use crate::arch::misc::memory_barrier;
use crate::clock;
use crate::config::{HZ, KERNEL_TIMERS, TICK_PERIOD};
use crate::devices::{Channel, SystemTimer};
use crate::error::{Error, Result};
use crate::interrupt::{InterruptController, InterruptHandler};
use crate::kernel_timer::{
    report_start_failure, ticks_from_duration, KernelTimerHandle, KernelTimerHandler,
    KernelTimers,
};
use crate::sync::IrqGuard;
use crate::tick::{self, TickCounter, TimeStamp, TIME_STRING_CAPACITY};

/// Tick source plus `N` kernel timers.
pub struct TimerContext<T, const N: usize = KERNEL_TIMERS> {
    hardware: T,
    /// Compare channel owned by this context.
    channel: Channel,
    /// Counter cycles per tick.
    period: u32,
    ticks: TickCounter,
    timers: KernelTimers<N>,
    initialized: AtomicBool,
}

impl<T: SystemTimer, const N: usize> TimerContext<T, N> {
    /// A context ticking on the channel from `config.toml`.
    pub const fn new(hardware: T) -> Self {
        Self::with_channel(hardware, Channel::CONFIGURED)
    }

    pub const fn with_channel(hardware: T, channel: Channel) -> Self {
        TimerContext {
            hardware,
            channel,
            period: TICK_PERIOD,
            ticks: TickCounter::new(),
            timers: KernelTimers::new(),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn hardware(&self) -> &T {
        &self.hardware
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Connect the tick interrupt and program the first compare match.
    pub fn initialize(&'static self, controller: &mut dyn InterruptController) -> Result<()>
    where
        T: Sync + 'static,
    {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyInitialized);
        }

        controller.connect(self.channel.interrupt(), self);

        memory_barrier();
        let compare = self.hardware.counter().wrapping_add(self.period);
        self.hardware.set_compare(self.channel, compare);
        memory_barrier();

        debug!(
            "timer: {} Hz on {:?} (irq {}), {} kernel timers",
            HZ,
            self.channel,
            self.channel.interrupt().irq(),
            N
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Raw value of the free-running hardware counter.
    pub fn clock_ticks(&self) -> u32 {
        clock::read_ticks(&self.hardware)
    }

    /// Tick interrupts since initialization.
    pub fn ticks(&self) -> u32 {
        self.ticks.ticks()
    }

    /// Whole seconds since initialization.
    pub fn time(&self) -> u32 {
        self.ticks.seconds()
    }

    /// Current time, or `None` before the first tick.
    pub fn timestamp(&self) -> Option<TimeStamp> {
        let (ticks, seconds) = {
            let guard = IrqGuard::new();
            self.ticks.snapshot(&guard)
        };
        TimeStamp::new(ticks, seconds)
    }

    /// Current time as `HH:MM:SS.ff`, or `None` before the first tick.
    pub fn time_string(&self) -> Option<ArrayString<TIME_STRING_CAPACITY>> {
        self.timestamp().map(|stamp| stamp.to_array_string())
    }

    /// Time since the first tick.
    pub fn uptime(&self) -> Duration {
        let (ticks, seconds) = {
            let guard = IrqGuard::new();
            self.ticks.snapshot(&guard)
        };
        tick::uptime(ticks, seconds)
    }

    /// Arm a one-shot timer `delay` ticks from now.
    ///
    /// The handler runs in interrupt context. Fails with
    /// [`Error::Exhausted`] when all `N` slots are armed; nothing retries.
    pub fn start_kernel_timer(
        &self,
        delay: u32,
        handler: KernelTimerHandler<N>,
        param: usize,
        context: usize,
    ) -> Result<KernelTimerHandle> {
        let result = {
            let guard = IrqGuard::new();
            let now = self.ticks.ticks();
            self.timers
                .start(&guard, now, delay, handler, param, context)
        };
        result.inspect_err(report_start_failure)
    }

    /// Like [`start_kernel_timer`](Self::start_kernel_timer), rounding
    /// `delay` up to whole ticks.
    pub fn start_kernel_timer_after(
        &self,
        delay: Duration,
        handler: KernelTimerHandler<N>,
        param: usize,
        context: usize,
    ) -> Result<KernelTimerHandle> {
        let ticks = ticks_from_duration(delay).inspect_err(report_start_failure)?;
        self.start_kernel_timer(ticks, handler, param, context)
    }

    /// Disarm a timer. Harmless if it already fired.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is outside `1..=N`.
    #[track_caller]
    pub fn cancel_kernel_timer(&self, handle: KernelTimerHandle) {
        let guard = IrqGuard::new();
        self.timers.cancel(&guard, handle);
    }

    /// Number of armed kernel timers.
    pub fn armed_timers(&self) -> usize {
        let guard = IrqGuard::new();
        self.timers.armed(&guard)
    }

    pub fn is_armed(&self, handle: KernelTimerHandle) -> bool {
        let guard = IrqGuard::new();
        self.timers.is_armed(&guard, handle)
    }

    /// Service the tick interrupt.
    ///
    /// # Panics
    ///
    /// Panics if the channel's match bit is not set.
    pub fn handle_interrupt(&self) {
        // Nested: the exception entry has already masked IRQs
        let guard = IrqGuard::new();

        memory_barrier();

        let matched = self.channel.status();
        assert!(
            self.hardware.status().contains(matched),
            "timer interrupt without {:?} match",
            self.channel
        );

        // Next match is relative to now, so a late handler drops ticks
        // instead of bunching them up.
        let compare = self.hardware.counter().wrapping_add(self.period);
        self.hardware.set_compare(self.channel, compare);

        self.hardware.acknowledge(matched);

        memory_barrier();

        let now = self.ticks.advance(&guard);
        self.timers.poll(&guard, now);
    }
}

impl<T: SystemTimer + Sync, const N: usize> InterruptHandler for TimerContext<T, N> {
    fn handle_interrupt(&self) {
        TimerContext::handle_interrupt(self);
    }
}
