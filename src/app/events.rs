//! Outbound signal events.
//!
//! The [`SignalService`](super::service::SignalService) emits these through
//! the [`EventSink`](super::ports::EventSink) port when
//! `SignalConfig::report_events` is set.  Adapters on the other side decide
//! what to do with them.

use crate::error::BankFault;
use crate::timing::TimingSnapshot;

/// Structured events emitted by the signal core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    /// Setup finished; commands are accepted from now on.
    Ready(TimingSnapshot),

    /// The cycle was re-sized at a division-0 restart.
    CycleAdjusted { cycle_time_us: u32, pulse_us: u32, lit: usize },

    /// The ramp clock entered a new division.
    DivisionChanged { division: u8, pass_count: u32 },

    /// Lamps reached full dark at the end of a ramped shutdown.
    LampDark { count: usize },

    /// The charlieplex safety net tripped.  Pins are no longer driven.
    /// Always emitted, whatever `report_events` says.
    SafetyFault(BankFault),
}
