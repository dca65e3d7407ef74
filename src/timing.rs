//! Adaptive multiplex timing.
//!
//! Two fixed-point exponential moving averages track what the scheduler
//! itself costs: the pin-switching overhead per LED activation (slow,
//! α = 1/16) and the latency between ticks (fast, α = 1/4).  From these and
//! the number of lit lamps the controller derives the per-LED pulse and the
//! real cycle length.
//!
//! ```text
//!   pulse = max(min_pulse, target / lit − overhead)
//!   cycle = (pulse + overhead) × lit
//! ```

use crate::app::ports::deadline_reached;

// ---------------------------------------------------------------------------
// Fixed-point moving average
// ---------------------------------------------------------------------------

/// Exponential moving average with α = 1/2^k, scaled by 32.
///
/// `acc = sample·32·α + acc·(1 − α)`, evaluated with shifts only.
#[derive(Debug, Clone, Copy)]
pub struct FixedEma {
    acc: u64,
    k: u8,
}

impl FixedEma {
    pub const SCALE_SHIFT: u8 = 5;

    pub const fn new(k: u8) -> Self {
        Self { acc: 0, k }
    }

    pub fn add(&mut self, sample: u32) {
        let keep = (1u64 << self.k) - 1;
        self.acc = (u64::from(sample) << (Self::SCALE_SHIFT - self.k)) + ((self.acc * keep) >> self.k);
    }

    pub const fn value(&self) -> u32 {
        ((self.acc + 16) >> Self::SCALE_SHIFT) as u32
    }
}

// ---------------------------------------------------------------------------
// Timing controller
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TimingController {
    target_cycle_us: u32,
    cycle_time_us: u32,
    pulse_us: u32,
    min_pulse_us: u32,
    overhead: FixedEma,
    loop_latency: FixedEma,
    loop_latency_cap_us: u32,
    last_lamp_count: usize,
    /// `None` until the first lamp pulse is scheduled; counts as expired.
    expires_at: Option<u32>,
    last_loop_stamp: u32,
}

impl TimingController {
    pub fn new(
        target_cycle_us: u32,
        min_pulse_us: u32,
        initial_overhead_us: u32,
        loop_latency_cap_us: u32,
    ) -> Self {
        let mut overhead = FixedEma::new(4);
        overhead.add(initial_overhead_us);
        Self {
            target_cycle_us,
            cycle_time_us: target_cycle_us,
            pulse_us: min_pulse_us,
            min_pulse_us,
            overhead,
            loop_latency: FixedEma::new(2),
            loop_latency_cap_us,
            last_lamp_count: 0,
            expires_at: None,
            last_loop_stamp: 0,
        }
    }

    /// Recompute pulse and cycle for `lit` lamps.  Returns the new cycle time.
    pub fn adjust(&mut self, lit: usize) -> u32 {
        self.last_lamp_count = lit;
        let n = lit.max(1) as i64;
        let overhead = i64::from(self.overhead.value());

        let pulse = (i64::from(self.target_cycle_us) / n - overhead).max(i64::from(self.min_pulse_us));
        self.pulse_us = pulse as u32;
        self.cycle_time_us = ((pulse + overhead) * n).min(i64::from(u32::MAX)) as u32;
        self.cycle_time_us
    }

    /// Accept a new preferred cycle time.  Returns `true` when it is shorter
    /// than the cycle currently in force, in which case the caller must
    /// restart the ramp so it cannot overrun the flash interval.
    pub fn set_target_cycle(&mut self, target_us: u32) -> bool {
        self.target_cycle_us = target_us;
        target_us < self.cycle_time_us
    }

    /// More than one lamp lit since the last recompute.
    pub const fn lamp_count_jumped(&self, lit: usize) -> bool {
        lit > self.last_lamp_count + 1
    }

    // ── Per-LED timer ──────────────────────────────────────────

    pub fn timer_expired(&self, now: u32) -> bool {
        self.expires_at.is_none_or(|t| deadline_reached(now, t))
    }

    /// Schedule the next lamp switch relative to `from`, trimming the part of
    /// the pulse the loop latency will overshoot anyway.
    pub fn restart_timer(&mut self, from: u32) {
        let loop_avg = self.loop_latency.value();
        let error = if loop_avg == 0 { 0 } else { self.pulse_us % loop_avg };
        let duration = self.pulse_us - error + self.overhead.value();
        self.expires_at = Some(from.wrapping_add(duration));
    }

    // ── Measurements ───────────────────────────────────────────

    pub fn record_overhead(&mut self, sample_us: u32) {
        self.overhead.add(sample_us);
    }

    /// Close out one tick that began at `tick_start`; `now` opens the next.
    pub fn record_loop(&mut self, tick_start: u32, now: u32) {
        let sample = tick_start.wrapping_sub(self.last_loop_stamp);
        self.loop_latency.add(sample.min(self.loop_latency_cap_us));
        self.last_loop_stamp = now;
    }

    // ── Accessors ──────────────────────────────────────────────

    pub const fn target_cycle_us(&self) -> u32 {
        self.target_cycle_us
    }

    pub const fn cycle_time_us(&self) -> u32 {
        self.cycle_time_us
    }

    pub const fn pulse_us(&self) -> u32 {
        self.pulse_us
    }

    pub const fn overhead_us(&self) -> u32 {
        self.overhead.value()
    }

    pub const fn loop_latency_us(&self) -> u32 {
        self.loop_latency.value()
    }

    pub const fn last_lamp_count(&self) -> usize {
        self.last_lamp_count
    }
}

/// Point-in-time view of the timing state, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSnapshot {
    pub target_cycle_us: u32,
    pub cycle_time_us: u32,
    pub pulse_us: u32,
    pub overhead_us: u32,
    pub loop_latency_us: u32,
    pub cycles_per_division: u32,
    pub flash_rate_fpm: u16,
    pub half_interval_us: u32,
}
