//! Time sources for budgeting a run.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Monotonic time source. Only differences between readings are used.
pub trait Clock: Send {
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that advances by a fixed step on every reading.
///
/// A run checks the clock once at the start and once before each chunk, so
/// with a step of `s` and a budget of `n * s` a pass reads `n - 1` chunks.
#[derive(Debug, Clone)]
pub struct TickClock {
    step: Duration,
    current: Cell<Duration>,
}

impl TickClock {
    pub fn new(step: Duration) -> Self {
        Self {
            step,
            current: Cell::new(Duration::ZERO),
        }
    }
}

impl Clock for TickClock {
    fn now(&self) -> Duration {
        let now = self.current.get();
        self.current.set(now + self.step);
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_clock_advances_per_reading() {
        let clock = TickClock::new(Duration::from_millis(10));
        assert_eq!(clock.now(), Duration::ZERO);
        assert_eq!(clock.now(), Duration::from_millis(10));
        assert_eq!(clock.now(), Duration::from_millis(20));
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now();
        assert!(clock.now() >= first);
    }
}
