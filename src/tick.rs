//! Tick and seconds accounting.
//!
//! Both counters are written only by the tick interrupt. A single counter can
//! be read at any time without a guard; the pair needs one to avoid reading
//! `ticks` from one interrupt and `seconds` from the next.

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicU32, Ordering};
use core::time::Duration;

use arrayvec::ArrayString;

use crate::config::HZ;
use crate::sync::IrqGuard;

/// Room for the longest `HH:MM:SS.ff` a `u32` seconds counter can produce.
pub const TIME_STRING_CAPACITY: usize = 20;

/// Ticks since the first interrupt and whole seconds derived from them.
#[derive(Debug)]
pub struct TickCounter {
    ticks: AtomicU32,
    seconds: AtomicU32,
}

impl TickCounter {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU32::new(0),
            seconds: AtomicU32::new(0),
        }
    }

    /// Number of tick interrupts so far, modulo 2^32.
    #[inline]
    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Whole seconds since the first tick.
    #[inline]
    pub fn seconds(&self) -> u32 {
        self.seconds.load(Ordering::Relaxed)
    }

    /// Consistent `(ticks, seconds)` pair.
    pub fn snapshot(&self, _guard: &IrqGuard) -> (u32, u32) {
        (self.ticks(), self.seconds())
    }

    /// Count one tick, returning the new tick value. Tick interrupt only.
    ///
    /// `seconds` moves exactly when `ticks` reaches a multiple of `HZ`, so the
    /// two never drift apart. Once `ticks` wraps they do, since 2^32 is not a
    /// multiple of `HZ` in general.
    pub fn advance(&self, _guard: &IrqGuard) -> u32 {
        let ticks = self.ticks().wrapping_add(1);
        self.ticks.store(ticks, Ordering::Relaxed);
        if ticks % HZ == 0 {
            self.seconds
                .store(self.seconds().wrapping_add(1), Ordering::Relaxed);
        }
        ticks
    }
}

/// A point in time since boot, printed as `HH:MM:SS.ff`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeStamp {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub hundredths: u32,
}

impl TimeStamp {
    /// Builds a timestamp from a tick snapshot.
    ///
    /// Returns `None` while `ticks` is 0, which stands for "no tick yet". A
    /// counter that wrapped to exactly 0 reads the same for one tick.
    pub fn new(ticks: u32, seconds: u32) -> Option<Self> {
        if ticks == 0 {
            return None;
        }

        let fraction = (ticks % HZ) as u64;

        Some(TimeStamp {
            hours: seconds / 3600,
            minutes: seconds / 60 % 60,
            seconds: seconds % 60,
            hundredths: (fraction * 100 / HZ as u64) as u32,
        })
    }

    /// Renders the timestamp without allocating.
    pub fn to_array_string(&self) -> ArrayString<TIME_STRING_CAPACITY> {
        let mut text = ArrayString::new();
        // At most 7 hour digits plus 9 bytes for the rest, always fits
        let _ = write!(text, "{}", self);
        text
    }
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:02}",
            self.hours, self.minutes, self.seconds, self.hundredths
        )
    }
}

/// Time since the first tick, at tick resolution.
pub fn uptime(ticks: u32, seconds: u32) -> Duration {
    let fraction = (ticks % HZ) as u64;
    Duration::from_secs(seconds as u64)
        + Duration::from_nanos(fraction * 1_000_000_000 / HZ as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advance(counter: &TickCounter, n: u32) {
        let guard = IrqGuard::new();
        for _ in 0..n {
            counter.advance(&guard);
        }
    }

    #[test]
    fn test_ticks_and_seconds() {
        let counter = TickCounter::new();
        assert_eq!(counter.ticks(), 0);

        advance(&counter, HZ - 1);
        assert_eq!(counter.ticks(), HZ - 1);
        assert_eq!(counter.seconds(), 0);

        advance(&counter, 1);
        assert_eq!(counter.seconds(), 1);

        advance(&counter, 3 * HZ + 7);
        assert_eq!(counter.ticks(), 4 * HZ + 7);
        assert_eq!(counter.seconds(), counter.ticks() / HZ);
    }

    #[test]
    fn test_seconds_track_ticks_every_step() {
        let counter = TickCounter::new();
        let guard = IrqGuard::new();
        for expected in 1..=(5 * HZ + 3) {
            assert_eq!(counter.advance(&guard), expected);
            assert_eq!(counter.snapshot(&guard), (expected, expected / HZ));
        }
    }

    #[test]
    fn test_timestamp_none_before_first_tick() {
        assert_eq!(TimeStamp::new(0, 0), None);
    }

    #[test]
    fn test_timestamp_format() {
        let seconds = 3600 + 2 * 60 + 3;
        let ticks = seconds * HZ + HZ / 4;
        let stamp = TimeStamp::new(ticks, seconds).unwrap();

        assert_eq!(stamp.hours, 1);
        assert_eq!(stamp.minutes, 2);
        assert_eq!(stamp.seconds, 3);
        assert_eq!(stamp.hundredths, (HZ / 4) * 100 / HZ);
        assert_eq!(
            stamp.to_array_string().as_str(),
            format!("01:02:03.{:02}", stamp.hundredths)
        );
    }

    #[test]
    fn test_timestamp_hundredths_at_100hz() {
        // At 100 Hz the fraction is the tick count modulo 100.
        if HZ == 100 {
            let stamp = TimeStamp::new(12_345, 123).unwrap();
            assert_eq!(stamp.to_string(), "00:02:03.45");
        }
    }

    #[test]
    fn test_timestamp_widest() {
        let stamp = TimeStamp::new(u32::MAX, u32::MAX).unwrap();
        let text = stamp.to_array_string();
        assert!(text.starts_with("1193046:28:15."));
        assert_eq!(text.len(), 16);
    }

    #[test]
    fn test_uptime() {
        assert_eq!(uptime(HZ * 2, 2), Duration::from_secs(2));
        let half = uptime(HZ / 2, 0);
        assert!(half <= Duration::from_millis(500));
        assert!(half > Duration::from_millis(490) || HZ < 100);
    }
}
