//! Signal driver configuration
//!
//! All tunable timing parameters for the multiplexer.  Defaults suit a
//! 16 MHz class microcontroller driving roughly a dozen lit lamps.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hard ceiling on the flash rate accepted by [`SignalConfig::validate`].
pub const FLASH_RATE_CEILING_FPM: u16 = 6000;

/// Core signal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    // --- Multiplexing ---
    /// Preferred time to visit every lit lamp once (microseconds).
    /// Stretched automatically when too many lamps are lit.
    pub cycle_time_us: u32,
    /// Minimum on-time per LED per cycle (microseconds).
    pub min_pulse_us: u32,
    /// Longest cycle time a caller may request (microseconds).
    pub max_cycle_time_us: u32,

    // --- Flashing ---
    /// Flash / ramp rate in flashes per minute.
    pub flash_rate_fpm: u16,
    /// Highest flash rate a caller may request.
    pub max_flash_rate_fpm: u16,

    // --- Adaptive timing ---
    /// Seed sample for the switching-overhead average (microseconds).
    pub initial_overhead_us: u32,
    /// Loop-latency samples are capped here to bound the fixed-point range.
    pub loop_latency_cap_us: u32,

    // --- Registration ---
    /// Settle time for each pin while draining residual charge at registration.
    pub drain_settle_us: u32,

    // --- Observability ---
    /// Emit [`SignalEvent`](crate::app::events::SignalEvent)s to the event sink.
    pub report_events: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            // Multiplexing
            cycle_time_us: 2500,
            min_pulse_us: 200,
            max_cycle_time_us: 20_000, // flicker becomes visible beyond this

            // Flashing
            flash_rate_fpm: 60, // 1 flash / s, typical US practice
            max_flash_rate_fpm: 200,

            // Adaptive timing
            initial_overhead_us: 100,
            loop_latency_cap_us: 1000,

            // Registration
            drain_settle_us: 1000,

            // Observability
            report_events: false,
        }
    }
}

impl SignalConfig {
    /// Shortest cycle time a caller may request.
    pub const fn min_cycle_time_us(&self) -> u32 {
        2 * self.min_pulse_us
    }

    /// Range-check every field.  Rejects rather than clamps.
    pub fn validate(&self) -> Result<()> {
        if self.min_pulse_us == 0 {
            return Err(Error::Config("min_pulse_us must be non-zero"));
        }
        if self.max_cycle_time_us < self.min_cycle_time_us() {
            return Err(Error::Config("max_cycle_time_us below 2 x min_pulse_us"));
        }
        if self.cycle_time_us < self.min_cycle_time_us()
            || self.cycle_time_us > self.max_cycle_time_us
        {
            return Err(Error::Config("cycle_time_us out of range"));
        }
        if self.max_flash_rate_fpm == 0 || self.max_flash_rate_fpm > FLASH_RATE_CEILING_FPM {
            return Err(Error::Config("max_flash_rate_fpm out of range"));
        }
        if self.flash_rate_fpm == 0 || self.flash_rate_fpm > self.max_flash_rate_fpm {
            return Err(Error::Config("flash_rate_fpm out of range"));
        }
        if self.loop_latency_cap_us == 0 || self.loop_latency_cap_us > 4096 {
            // bounds the fixed-point accumulator
            return Err(Error::Config("loop_latency_cap_us out of range"));
        }
        Ok(())
    }

    /// Parse a JSON document and validate it.  Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed JSON"))?;
        config.validate()?;
        Ok(config)
    }
}
