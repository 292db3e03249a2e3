//! Monotonic time source behind a trait.
//!
//! All simulated motion is computed on read from "when did the motion
//! start" snapshots, so the one thing every kinematic path needs is a
//! monotonic *now*. Production code uses [`SystemClock`]; tests inject a
//! [`ManualClock`] and advance it explicitly instead of sleeping.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// A monotonic time source.
pub trait Clock: Send + Sync {
    /// Current monotonic instant.
    fn now(&self) -> Instant;
}

/// Wall-clock backed [`Clock`] used by the running emulator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A [`Clock`] that only moves when told to.
///
/// Handed to instruments in tests and scripted scenarios so that "wait two
/// seconds" is `clock.advance_secs(2.0)` rather than an actual sleep.
#[derive(Debug)]
pub struct ManualClock {
    epoch: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    /// A clock frozen at its creation instant.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            epoch: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        })
    }

    /// Move the clock forward.
    pub fn advance(&self, step: Duration) {
        let mut elapsed = self
            .elapsed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *elapsed += step;
    }

    /// Move the clock forward by fractional seconds.
    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let elapsed = self
            .elapsed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.epoch + *elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_starts_frozen() {
        let clock = ManualClock::new();
        let a = clock.now();
        let b = clock.now();
        assert_eq!(a, b);
    }

    #[test]
    fn test_manual_clock_advances_on_demand() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.advance_secs(1.5);
        assert_eq!(clock.now() - start, Duration::from_secs_f64(1.5));
        clock.advance(Duration::from_millis(500));
        assert_eq!(clock.now() - start, Duration::from_secs(2));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
