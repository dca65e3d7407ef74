//! Port traits — the hexagonal boundary between the lamp scheduler and the board.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SignalService (domain)
//! ```
//!
//! Driven adapters (GPIO, microsecond counter, event sinks) implement these
//! traits.  The [`SignalService`](super::service::SignalService) consumes
//! them via generics at each call site, so the domain core never touches
//! hardware directly and owns none of it.

use embedded_hal::digital::PinState;

use crate::pins::{PinId, PinMode, default_pin_valid};

// ───────────────────────────────────────────────────────────────
// Pin driver port (driven adapter: domain → GPIO)
// ───────────────────────────────────────────────────────────────

/// Raw pin access for charlieplexed lamps.
///
/// Pins are addressed by number because every lamp pin flips between
/// anode, cathode and high impedance at runtime; a typed per-pin HAL
/// handle cannot express that.
pub trait PinDriver {
    /// Switch a pin between high impedance and driven output.
    fn set_mode(&mut self, pin: PinId, mode: PinMode);

    /// Set the output level of a pin.  Only meaningful in output mode.
    fn set_level(&mut self, pin: PinId, level: PinState);

    /// Whether `pin` may carry a lamp on this board.
    fn is_valid_pin(&self, pin: PinId) -> bool {
        default_pin_valid(pin)
    }
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: hardware timer → domain)
// ───────────────────────────────────────────────────────────────

/// Free-running microsecond counter.
///
/// The counter wraps at `u32::MAX`; every comparison the scheduler makes
/// uses a signed wrapping difference, so a wrap is harmless.
pub trait Clock {
    fn now_micros(&self) -> u32;
}

/// `true` once `now` has reached or passed `deadline`, across a wrap.
pub const fn deadline_reached(now: u32, deadline: u32) -> bool {
    (now.wrapping_sub(deadline) as i32) >= 0
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`SignalEvent`](super::events::SignalEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::SignalEvent);
}

/// Sink that discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &super::events::SignalEvent) {}
}
