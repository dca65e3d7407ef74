//! Signal service — the hexagonal core.
//!
//! [`SignalService`] owns the lamp arena and the multiplex scheduler and
//! exposes the whole command surface.  Pins, the microsecond clock and the
//! event sink are injected at call sites, so the service owns no hardware
//! and runs unchanged against the in-memory adapters in tests.
//!
//! ```text
//!   commands ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                │      SignalService       │
//!   PinDriver ◀──│  lamps · ramp · timing   │◀── Clock
//!                └──────────────────────────┘
//! ```
//!
//! Invalid input (unknown positions, bad colors, out-of-range timing,
//! commands before [`setup`](SignalService::setup)) is logged at `debug`
//! and otherwise ignored.  The one fatal condition, a charlieplex bank
//! fault, is latched: the service stops driving pins and every later
//! [`update`](SignalService::update) returns the same error.

use embedded_hal::delay::DelayNs;
use log::{debug, error, info};

use crate::config::SignalConfig;
use crate::error::{BankFault, Error, Result};
use crate::lamp::{Color, Lamp, LampId};
use crate::pins::{PinId, Wiring};
use crate::scheduler::{MultiplexScheduler, TickReport};
use crate::timing::TimingSnapshot;

use super::channels::CommandChannel;
use super::commands::SignalCommand;
use super::events::SignalEvent;
use super::ports::{Clock, EventSink, PinDriver};

// ───────────────────────────────────────────────────────────────
// SignalService
// ───────────────────────────────────────────────────────────────

pub struct SignalService {
    config: SignalConfig,
    scheduler: MultiplexScheduler,
    ready: bool,
    fault: Option<BankFault>,
}

impl SignalService {
    /// Construct the service.  The configuration is used as given; run
    /// [`SignalConfig::validate`] first when it comes from outside.
    ///
    /// Commands are ignored until [`setup`](Self::setup) has run.
    pub fn new(config: SignalConfig) -> Self {
        let scheduler = MultiplexScheduler::new(&config);
        Self {
            config,
            scheduler,
            ready: false,
            fault: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// One-time setup.  Sizes the cycle and starts accepting commands.
    /// Calling it again does nothing.
    pub fn setup(&mut self, sink: &mut impl EventSink) {
        if self.ready {
            return;
        }
        self.ready = true;
        let cycle = self.scheduler.calibrate();
        let timing = self.scheduler.timing();
        info!(
            "signal driver ready: cycle {cycle} us, pulse {} us, {} fpm, {} cycles/division",
            timing.pulse_us, timing.flash_rate_fpm, timing.cycles_per_division
        );
        if self.config.report_events {
            sink.emit(&SignalEvent::Ready(timing));
        }
    }

    /// Register one LED.  Rejected silently for identical or invalid pins,
    /// a dark color, a full arena, or before setup.
    #[allow(clippy::too_many_arguments)]
    pub fn register(
        &mut self,
        mast: u8,
        head: u8,
        lamp: u8,
        anode: PinId,
        cathode: PinId,
        color: Color,
        hw: &mut (impl PinDriver + DelayNs),
    ) -> Option<LampId> {
        if !self.accepting("register") {
            return None;
        }
        let settle = self.config.drain_settle_us;
        let id = self.scheduler.registry_mut().register(
            mast,
            head,
            lamp,
            Wiring::new(anode, cathode),
            color,
            settle,
            hw,
        );
        if let Some(id) = id {
            debug!("lamp {id:?}: M{mast} H{head} L{lamp} color {} pins {anode}/{cathode}", color.code());
        }
        id
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one scheduler tick.  Call from the polling loop as often as
    /// possible; the call never blocks.
    pub fn update(&mut self, hw: &mut (impl PinDriver + Clock), sink: &mut impl EventSink) -> Result<()> {
        if let Some(fault) = self.fault {
            return Err(Error::Safety(fault));
        }
        if !self.ready {
            return Ok(());
        }

        match self.scheduler.tick(hw) {
            Ok(report) => {
                if self.config.report_events {
                    self.emit_report(&report, sink);
                }
                Ok(())
            }
            Err(fault) => {
                error!("SAFETY | {fault}; pin driving halted");
                self.fault = Some(fault);
                sink.emit(&SignalEvent::SafetyFault(fault));
                Err(Error::Safety(fault))
            }
        }
    }

    fn emit_report(&self, report: &TickReport, sink: &mut impl EventSink) {
        if let Some(cycle_time_us) = report.adjusted {
            sink.emit(&SignalEvent::CycleAdjusted {
                cycle_time_us,
                pulse_us: self.scheduler.timing().pulse_us,
                lit: self.scheduler.registry().count_lit(),
            });
        }
        if let Some(division) = report.division {
            sink.emit(&SignalEvent::DivisionChanged {
                division,
                pass_count: self.scheduler.pass_count(),
            });
        }
        if report.darkened > 0 {
            sink.emit(&SignalEvent::LampDark {
                count: report.darkened,
            });
        }
    }

    // ── Lamp commands ─────────────────────────────────────────

    /// Light a lamp position, or ramp it down with `lit = false`.
    /// `flashing` applies even to a lamp that is already lit, and is
    /// ignored when `lit` is false.
    pub fn set_lamp(&mut self, mast: u8, head: u8, lamp: u8, lit: bool, flashing: bool) {
        if !self.accepting("set_lamp") {
            return;
        }
        if !lit {
            self.shut_down(mast, head, Some(lamp));
            return;
        }
        for l in self.scheduler.registry_mut().matching_mut(mast, head, Some(lamp)) {
            l.flags.flashing = flashing;
            if !l.flags.lit {
                l.flags.begin_start();
            }
        }
    }

    /// Ramp down every lamp on a head.  Lamps still waiting to start go
    /// dark at once.
    pub fn clear_head(&mut self, mast: u8, head: u8) {
        if !self.accepting("clear_head") {
            return;
        }
        self.shut_down(mast, head, None);
    }

    /// Show `color` on a head.  The head is cleared first, so an invalid or
    /// dark color leaves it dark.
    pub fn set_head_color(&mut self, mast: u8, head: u8, color: Color, flashing: bool) {
        if !self.accepting("set_head_color") {
            return;
        }
        self.shut_down(mast, head, None);
        if !color.is_settable() {
            debug!("set_head_color M{mast} H{head}: color {} not settable", color.code());
            return;
        }
        self.select_color(mast, head, None, color, flashing);
    }

    /// Show `color` at one lamp position.  Re-selecting the lamp's own color
    /// blinks it off and on.
    pub fn set_lamp_color(&mut self, mast: u8, head: u8, lamp: u8, color: Color, flashing: bool) {
        if !self.accepting("set_lamp_color") {
            return;
        }
        if !color.is_settable() {
            debug!("set_lamp_color M{mast} H{head} L{lamp}: color {} not settable", color.code());
            return;
        }
        self.select_color(mast, head, Some(lamp), color, flashing);
    }

    /// Light a lamp flashing in the given phase.  Two lamps set to opposite
    /// phases form an alternating pair.
    pub fn set_alternate(&mut self, mast: u8, head: u8, lamp: u8, alternate: bool) {
        if !self.accepting("set_alternate") {
            return;
        }
        for l in self.scheduler.registry_mut().matching_mut(mast, head, Some(lamp)) {
            l.flags.flashing = true;
            l.flags.alternate = alternate;
            l.flags.begin_start();
        }
    }

    /// Toggle the intensity ramp.  Takes effect on the next start or stop.
    pub fn set_ramp(&mut self, mast: u8, head: u8, lamp: u8, enabled: bool) {
        if !self.accepting("set_ramp") {
            return;
        }
        for l in self.scheduler.registry_mut().matching_mut(mast, head, Some(lamp)) {
            l.flags.ramp = enabled;
        }
    }

    // ── Timing commands ───────────────────────────────────────

    /// Preferred multiplex cycle time.  Values outside
    /// `[2 × min_pulse_us, max_cycle_time_us]` are ignored.
    pub fn set_cycle_time(&mut self, cycle_time_us: u32) {
        if !self.accepting("set_cycle_time") {
            return;
        }
        if cycle_time_us < self.config.min_cycle_time_us() || cycle_time_us > self.config.max_cycle_time_us {
            debug!("set_cycle_time: {cycle_time_us} us out of range");
            return;
        }
        if let Some(cycle) = self.scheduler.set_target_cycle(cycle_time_us) {
            info!("cycle time shortened to {cycle} us, ramp restarted");
        }
    }

    /// Flash rate in flashes per minute.  Values outside
    /// `[1, max_flash_rate_fpm]` are ignored.
    pub fn set_flash_rate(&mut self, fpm: u16) {
        if !self.accepting("set_flash_rate") {
            return;
        }
        if fpm == 0 || fpm > self.config.max_flash_rate_fpm {
            debug!("set_flash_rate: {fpm} fpm out of range");
            return;
        }
        self.scheduler.set_flash_rate(fpm);
        info!("flash rate {fpm} fpm");
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply a queued command.
    pub fn handle_command(&mut self, cmd: SignalCommand) {
        match cmd {
            SignalCommand::SetLamp { mast, head, lamp, lit, flashing } => {
                self.set_lamp(mast, head, lamp, lit, flashing);
            }
            SignalCommand::ClearHead { mast, head } => self.clear_head(mast, head),
            SignalCommand::SetHeadColor { mast, head, color, flashing } => {
                self.set_head_color(mast, head, color, flashing);
            }
            SignalCommand::SetLampColor { mast, head, lamp, color, flashing } => {
                self.set_lamp_color(mast, head, lamp, color, flashing);
            }
            SignalCommand::SetAlternate { mast, head, lamp, alternate } => {
                self.set_alternate(mast, head, lamp, alternate);
            }
            SignalCommand::SetRamp { mast, head, lamp, enabled } => {
                self.set_ramp(mast, head, lamp, enabled);
            }
            SignalCommand::SetCycleTime(us) => self.set_cycle_time(us),
            SignalCommand::SetFlashRate(fpm) => self.set_flash_rate(fpm),
        }
    }

    /// Apply every command waiting in `channel`.  Returns how many ran.
    pub fn drain_commands(&mut self, channel: &CommandChannel) -> usize {
        let mut applied = 0;
        while let Ok(cmd) = channel.try_receive() {
            self.handle_command(cmd);
            applied += 1;
        }
        applied
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// The latched safety fault, if the driver has halted.
    pub fn fault(&self) -> Option<BankFault> {
        self.fault
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    pub fn lamp(&self, id: LampId) -> Option<&Lamp> {
        self.scheduler.registry().get(id).filter(|_| id != LampId::SENTINEL)
    }

    /// Every lamp on a head, optionally narrowed to one lamp ordinal.
    pub fn lamps_at(
        &self,
        mast: u8,
        head: u8,
        lamp: Option<u8>,
    ) -> impl Iterator<Item = (LampId, &Lamp)> {
        self.scheduler
            .registry()
            .find(mast, head)
            .filter(move |(_, l)| lamp.is_none_or(|n| l.lamp == n))
    }

    pub fn lit_count(&self) -> usize {
        self.scheduler.registry().count_lit()
    }

    /// The lamp currently being multiplexed (`LampId::SENTINEL` when none).
    pub fn current_lamp(&self) -> LampId {
        self.scheduler.current_id()
    }

    pub fn division(&self) -> u8 {
        self.scheduler.division()
    }

    pub fn pass_count(&self) -> u32 {
        self.scheduler.pass_count()
    }

    pub fn timing(&self) -> TimingSnapshot {
        self.scheduler.timing()
    }

    // ── Internal ──────────────────────────────────────────────

    fn accepting(&self, what: &str) -> bool {
        if !self.ready {
            debug!("{what} ignored: setup has not run");
        }
        self.ready
    }

    /// Ramped shutdown of matching lamps.  A lamp that never got past its
    /// start hold was never shown and goes dark immediately.
    fn shut_down(&mut self, mast: u8, head: u8, lamp: Option<u8>) {
        let current = self.scheduler.current().wiring;
        let mut kill = false;
        for l in self.scheduler.registry_mut().matching_mut(mast, head, lamp) {
            if l.flags.never_shown() {
                l.flags.go_dark();
                kill |= l.wiring == current;
            } else if l.flags.lit && !l.flags.stopping {
                l.flags.begin_stop();
            }
        }
        if kill {
            self.scheduler.darkened(current);
        }
    }

    /// Start lamps answering `color`, stop the rest.  With a lamp ordinal,
    /// re-selecting a lamp's own color also re-arms its stop.
    fn select_color(&mut self, mast: u8, head: u8, lamp: Option<u8>, color: Color, flashing: bool) {
        let current = self.scheduler.current().wiring;
        let same_color_blinks = lamp.is_some();
        let mut kill = false;
        for l in self.scheduler.registry_mut().matching_mut(mast, head, lamp) {
            if l.color.answers(color) {
                l.flags.flashing = flashing;
                if l.flags.stopping && l.color.is_composite() {
                    // multi-color LED changing role: restart after the stop
                    l.flags.starting = true;
                } else if !l.flags.lit {
                    l.flags.begin_start();
                } else if l.color == color {
                    l.flags.starting = true;
                    if same_color_blinks {
                        l.flags.stopping = true;
                    }
                }
            } else if l.flags.lit {
                if l.flags.starting || !l.flags.ramp {
                    l.flags.go_dark();
                    kill |= l.wiring == current;
                } else if !l.flags.stopping {
                    l.flags.begin_stop();
                }
            }
        }
        if kill {
            self.scheduler.darkened(current);
        }
    }
}
