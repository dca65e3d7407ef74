//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured signal events through the
//! `log` facade.  Division changes are frequent (ten per flash interval) and
//! go out at `trace`; everything else at `info`, faults at `error`.

use log::{error, info, trace};

use crate::app::events::SignalEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`SignalEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &SignalEvent) {
        match event {
            SignalEvent::Ready(t) => {
                info!(
                    "READY | cycle={}us (target {}us) | pulse={}us | overhead={}us | \
                     {}fpm | {} cycles/div",
                    t.cycle_time_us,
                    t.target_cycle_us,
                    t.pulse_us,
                    t.overhead_us,
                    t.flash_rate_fpm,
                    t.cycles_per_division,
                );
            }
            SignalEvent::CycleAdjusted {
                cycle_time_us,
                pulse_us,
                lit,
            } => {
                info!("CYCLE | {}us | pulse={}us | lit={}", cycle_time_us, pulse_us, lit);
            }
            SignalEvent::DivisionChanged {
                division,
                pass_count,
            } => {
                trace!("DIV | {} | passes={}", division, pass_count);
            }
            SignalEvent::LampDark { count } => {
                info!("DARK | {} lamp(s) finished stopping", count);
            }
            SignalEvent::SafetyFault(fault) => {
                error!("FAULT | {}", fault);
            }
        }
    }
}
