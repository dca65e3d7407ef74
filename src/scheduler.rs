//! Multiplex scheduler.
//!
//! One call to [`MultiplexScheduler::tick`] per pass of the host's polling
//! loop.  The scheduler keeps a cursor on the lamp being shown, moves it to
//! the next lit lamp whenever the per-LED timer runs out, and switches the
//! anode/cathode pins so that exactly that LED (or nothing) is energized.
//!
//! ```text
//!   tick ─▶ lamp count jump? ──▶ restart at division 0
//!     │
//!     ├─▶ timer expired? ──▶ advance cursor, restart timer
//!     ├─▶ division changed? ──▶ release holds / advance lamps
//!     ├─▶ ramp curve ──▶ On / Off / PowerDown
//!     ├─▶ pin transitions (through the bank guard)
//!     └─▶ update averages, count the pass
//! ```
//!
//! The anode of the current lamp stays energized for as long as the lamp is
//! being multiplexed; the ramp curve only gates the cathode.

use log::{debug, info};

use crate::app::ports::{Clock, PinDriver};
use crate::config::SignalConfig;
use crate::division::{DivisionClock, DivisionStep, advance_division};
use crate::error::BankFault;
use crate::lamp::{Lamp, LampId};
use crate::pins::Wiring;
use crate::ramp::{self, Pulse};
use crate::registry::LampRegistry;
use crate::safety::BankGuard;
use crate::timing::{TimingController, TimingSnapshot};

/// What happened during one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Cycle time after a recompute, if one ran.
    pub adjusted: Option<u32>,
    /// Division entered this tick.
    pub division: Option<u8>,
    /// Lamps that finished a ramped shutdown.
    pub darkened: usize,
    /// The current lamp's cathode is live at the end of the tick.
    pub energized: bool,
}

pub struct MultiplexScheduler {
    registry: LampRegistry,
    clock: DivisionClock,
    timing: TimingController,
    guard: BankGuard,
    /// Arena slot of the lamp being multiplexed.  0 is the sentinel.
    cursor: usize,
    /// Drop the current lamp's pins on the next tick.
    kill: bool,
    /// Drop the anode too once the cathode is off.
    kill_anode: bool,
    anode_on: bool,
    cathode_on: bool,
}

impl MultiplexScheduler {
    pub fn new(config: &SignalConfig) -> Self {
        Self {
            registry: LampRegistry::new(),
            clock: DivisionClock::new(config.flash_rate_fpm, config.cycle_time_us),
            timing: TimingController::new(
                config.cycle_time_us,
                config.min_pulse_us,
                config.initial_overhead_us,
                config.loop_latency_cap_us,
            ),
            guard: BankGuard::new(),
            cursor: 0,
            kill: false,
            kill_anode: false,
            anode_on: false,
            cathode_on: false,
        }
    }

    /// Size the cycle for the lamps lit right now.  Returns the cycle time.
    pub fn calibrate(&mut self) -> u32 {
        let cycle = self.timing.adjust(self.registry.count_lit());
        self.clock.retime(cycle);
        cycle
    }

    // ═══════════════════════════════════════════════════════════════
    //  Tick
    // ═══════════════════════════════════════════════════════════════

    pub fn tick(&mut self, hw: &mut (impl PinDriver + Clock)) -> Result<TickReport, BankFault> {
        let start = hw.now_micros();
        let mut report = TickReport::default();

        if self.timing.lamp_count_jumped(self.registry.count_lit()) {
            self.restart_cycle(&mut report);
        }

        let last = self.current().wiring;
        let mut last_anode = last.anode;
        let last_cathode = last.cathode;

        // ── Next lamp ──────────────────────────────────────────
        let timer_expired = self.timing.timer_expired(start);
        let mut new_pass = false;
        let mut before = start;
        if timer_expired {
            let (next, wrapped) = self.registry.next_lit(self.cursor);
            new_pass = wrapped;
            if let Some(idx) = next {
                self.cursor = idx;
                self.kill = false;
            } else {
                self.cursor = 0;
            }
            before = hw.now_micros();
            self.timing.restart_timer(before);
        }

        // ── Division boundary ──────────────────────────────────
        match self.clock.poll() {
            DivisionStep::Unchanged => {}
            DivisionStep::Entered(div) => self.enter_division(div, &mut report),
            DivisionStep::Wrapped => {
                self.restart_cycle(&mut report);
                self.enter_division(0, &mut report);
            }
        }

        // ── Ramp decision ──────────────────────────────────────
        let mut enabled = false;
        if !self.kill {
            match ramp::pulse(&self.current().flags, self.clock.division(), self.clock.pass_count()) {
                Pulse::On => enabled = true,
                Pulse::Off => {}
                Pulse::PowerDown => {
                    self.kill = true;
                    self.kill_anode = true;
                }
            }
        }

        // ── Pins ───────────────────────────────────────────────
        let lamp = self.current().wiring;

        if (lamp.cathode != last_cathode || new_pass || self.kill) && self.cathode_on {
            self.guard.disable_cathode(last_cathode, hw)?;
            self.cathode_on = false;
        }

        if (lamp.anode != last_anode || self.kill) && self.anode_on {
            self.guard.disable_anode(last_anode, hw)?;
            self.anode_on = false;
            if !self.kill {
                self.guard.enable_anode(lamp.anode, hw)?;
                self.anode_on = true;
                last_anode = lamp.anode;
            }
        }

        if self.kill {
            self.kill_anode = true;
            self.kill = false;
        }

        if enabled && !self.anode_on {
            self.guard.enable_anode(lamp.anode, hw)?;
            self.anode_on = true;
            last_anode = lamp.anode;
        }
        if enabled && !self.cathode_on {
            self.guard.enable_cathode(lamp.cathode, hw)?;
            self.cathode_on = true;
        }
        if !enabled && self.cathode_on {
            self.guard.disable_cathode(lamp.cathode, hw)?;
            self.cathode_on = false;
        }

        if !self.cathode_on && self.kill_anode && self.anode_on {
            self.guard.disable_anode(last_anode, hw)?;
            self.anode_on = false;
        }
        self.kill_anode = false;

        // ── Bookkeeping ────────────────────────────────────────
        let now = hw.now_micros();
        if timer_expired {
            self.timing.record_overhead(now.wrapping_sub(before));
        }
        if new_pass {
            self.clock.record_pass();
        }
        self.timing.record_loop(start, now);

        report.energized = self.cathode_on;
        Ok(report)
    }

    fn enter_division(&mut self, division: u8, report: &mut TickReport) {
        report.division = Some(division);
        let current = self.current().wiring;
        let advance = advance_division(&mut self.registry, division, current);
        report.darkened += advance.darkened;
        if advance.kill_current {
            self.kill = true;
        }
    }

    /// Back to division 0 with a freshly sized cycle.
    fn restart_cycle(&mut self, report: &mut TickReport) {
        let previous = self.timing.cycle_time_us();
        self.clock.restart();
        let cycle = self.calibrate();
        if cycle == previous {
            debug!("cycle restart: {cycle} us, pulse {} us", self.timing.pulse_us());
        } else {
            info!(
                "cycle adjusted: {previous} -> {cycle} us, pulse {} us, {} lit",
                self.timing.pulse_us(),
                self.timing.last_lamp_count()
            );
        }
        report.adjusted = Some(cycle);
    }

    // ═══════════════════════════════════════════════════════════════
    //  Runtime tuning
    // ═══════════════════════════════════════════════════════════════

    /// New preferred cycle time (already range-checked).  Returns the new
    /// cycle time when the change forced a restart.
    pub fn set_target_cycle(&mut self, target_us: u32) -> Option<u32> {
        if self.timing.set_target_cycle(target_us) {
            let mut report = TickReport::default();
            self.restart_cycle(&mut report);
            report.adjusted
        } else {
            None
        }
    }

    /// New flash rate (already range-checked).
    pub fn set_flash_rate(&mut self, fpm: u16) {
        self.clock.set_flash_rate(fpm, self.timing.cycle_time_us());
    }

    /// Make sure the current lamp's pins are dropped if it just went dark.
    pub(crate) fn darkened(&mut self, wiring: Wiring) {
        if wiring == self.current().wiring {
            self.kill = true;
        }
    }

    // ═══════════════════════════════════════════════════════════════
    //  Queries
    // ═══════════════════════════════════════════════════════════════

    pub fn registry(&self) -> &LampRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut LampRegistry {
        &mut self.registry
    }

    pub fn current(&self) -> &Lamp {
        self.registry.slot(self.cursor)
    }

    pub fn current_id(&self) -> LampId {
        LampId(self.cursor as u8)
    }

    pub const fn division(&self) -> u8 {
        self.clock.division()
    }

    pub const fn pass_count(&self) -> u32 {
        self.clock.pass_count()
    }

    pub const fn guard(&self) -> &BankGuard {
        &self.guard
    }

    pub fn timing(&self) -> TimingSnapshot {
        TimingSnapshot {
            target_cycle_us: self.timing.target_cycle_us(),
            cycle_time_us: self.timing.cycle_time_us(),
            pulse_us: self.timing.pulse_us(),
            overhead_us: self.timing.overhead_us(),
            loop_latency_us: self.timing.loop_latency_us(),
            cycles_per_division: self.clock.cycles_per_division(),
            flash_rate_fpm: self.clock.flash_rate_fpm(),
            half_interval_us: self.clock.half_interval_us(),
        }
    }
}
