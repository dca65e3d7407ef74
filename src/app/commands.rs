//! Inbound commands to the signal service.
//!
//! Each variant mirrors one call on
//! [`SignalService`](super::service::SignalService).  Commands arriving
//! from another execution context go through the
//! [`CommandChannel`](super::channels::CommandChannel) and are applied by
//! the owner of the service between ticks.

use crate::lamp::Color;

/// Commands that external adapters can send into the signal core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalCommand {
    /// Light (`lit = true`) or ramp down one lamp position.
    SetLamp { mast: u8, head: u8, lamp: u8, lit: bool, flashing: bool },

    /// Ramp down every lamp on a head.
    ClearHead { mast: u8, head: u8 },

    /// Show one color on a head, darkening the others.
    SetHeadColor { mast: u8, head: u8, color: Color, flashing: bool },

    /// Show one color at a single lamp position.
    SetLampColor { mast: u8, head: u8, lamp: u8, color: Color, flashing: bool },

    /// Start a lamp flashing in the given phase (`true` = alternate).
    SetAlternate { mast: u8, head: u8, lamp: u8, alternate: bool },

    /// Enable or disable the intensity ramp on one position.
    SetRamp { mast: u8, head: u8, lamp: u8, enabled: bool },

    /// Preferred multiplex cycle time in microseconds.
    SetCycleTime(u32),

    /// Flash rate in flashes per minute.
    SetFlashRate(u16),
}
