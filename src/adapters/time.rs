//! Host time adapter.
//!
//! Provides the free-running microsecond counter the scheduler polls.
//! Backed by `std::time::Instant` and truncated to 32 bits, so it wraps
//! about every 71.6 minutes exactly like a microcontroller `micros()`
//! counter.

use std::time::Instant;

use crate::app::ports::Clock;

/// Monotonic microsecond clock for host builds and simulation.
pub struct StdClock {
    start: Instant,
    /// Added to every reading; lets tests start close to the wrap.
    offset: u32,
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl StdClock {
    pub fn new() -> Self {
        Self::with_offset(0)
    }

    pub fn with_offset(offset: u32) -> Self {
        Self {
            start: Instant::now(),
            offset,
        }
    }
}

impl Clock for StdClock {
    fn now_micros(&self) -> u32 {
        (self.start.elapsed().as_micros() as u32).wrapping_add(self.offset)
    }
}
