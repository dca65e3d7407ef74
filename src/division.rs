//! Ramp-division clock and the hold/release protocol.
//!
//! Every completed multiplex pass bumps a counter; the current division is
//! `pass_count / cycles_per_division`.  When it would reach ten the flash
//! interval is over and the scheduler restarts at division 0.
//!
//! Flag changes requested by commands are parked behind `hold` and only
//! take effect at fixed division boundaries:
//!
//! ```text
//!  division   0        3        4                   5         8        9
//!  normal              adv.start                    rel.stop           adv.stop
//!                                                                      rel.start
//!  alternate  rel.stop          adv.stop rel.start            adv.start
//! ```
//!
//! A start is never advanced while any lamp is stopping; a start hold is not
//! released while a same-phase lamp still holds a stop.

use log::trace;

use crate::lamp::Lamp;
use crate::pins::Wiring;
use crate::registry::LampRegistry;

pub const NUM_DIVISIONS: u8 = 10;
/// Cycles per division are rounded to a multiple of this.
pub const RAMP_CYCLES_STEP: u32 = 8;

pub const DIV_START: u8 = 3;
pub const DIV_REV_STOP: u8 = 4;
pub const DIV_HOLD_STOP: u8 = 5;
pub const DIV_REV_START: u8 = 8;
pub const DIV_STOP: u8 = 9;
pub const DIV_REV_HOLD_STOP: u8 = 0;

// ---------------------------------------------------------------------------
// Division clock
// ---------------------------------------------------------------------------

/// Result of polling the clock after a pass may have completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivisionStep {
    Unchanged,
    /// Moved to a new division inside the same flash interval.
    Entered(u8),
    /// The interval is over.  The caller must [`restart`](DivisionClock::restart).
    Wrapped,
}

#[derive(Debug, Clone)]
pub struct DivisionClock {
    fpm: u16,
    half_interval_us: u32,
    cycles_per_division: u32,
    pass_count: u32,
    division: u8,
}

impl DivisionClock {
    pub fn new(fpm: u16, cycle_time_us: u32) -> Self {
        let mut clock = Self {
            fpm,
            half_interval_us: 0,
            cycles_per_division: RAMP_CYCLES_STEP,
            pass_count: 0,
            division: 0,
        };
        clock.set_flash_rate(fpm, cycle_time_us);
        clock
    }

    /// Re-derive the division length for a new flash rate.  `fpm` must be
    /// non-zero; callers range-check it.
    pub fn set_flash_rate(&mut self, fpm: u16, cycle_time_us: u32) {
        let fpm = fpm.max(1);
        self.fpm = fpm;
        self.half_interval_us = 1000 * ((60_000 / u32::from(fpm)) / 2);

        let cycles_per_flash = 60_000_000 / (u64::from(fpm) * u64::from(cycle_time_us.max(1)));
        self.cycles_per_division = round_to_step(cycles_per_flash as u32 / u32::from(NUM_DIVISIONS));
    }

    /// Same flash rate, new cycle time.
    pub fn retime(&mut self, cycle_time_us: u32) {
        self.set_flash_rate(self.fpm, cycle_time_us);
    }

    pub fn restart(&mut self) {
        self.pass_count = 0;
        self.division = 0;
    }

    pub fn record_pass(&mut self) {
        self.pass_count = self.pass_count.wrapping_add(1);
    }

    pub fn poll(&mut self) -> DivisionStep {
        let div = self.pass_count / self.cycles_per_division;
        if div >= u32::from(NUM_DIVISIONS) {
            return DivisionStep::Wrapped;
        }
        let div = div as u8;
        if div == self.division {
            DivisionStep::Unchanged
        } else {
            self.division = div;
            DivisionStep::Entered(div)
        }
    }

    pub const fn division(&self) -> u8 {
        self.division
    }

    pub const fn pass_count(&self) -> u32 {
        self.pass_count
    }

    pub const fn flash_rate_fpm(&self) -> u16 {
        self.fpm
    }

    pub const fn half_interval_us(&self) -> u32 {
        self.half_interval_us
    }

    pub const fn cycles_per_division(&self) -> u32 {
        self.cycles_per_division
    }
}

/// Nearest multiple of [`RAMP_CYCLES_STEP`], ties down, never zero.
fn round_to_step(cycles: u32) -> u32 {
    let low = cycles - cycles % RAMP_CYCLES_STEP;
    let high = low + RAMP_CYCLES_STEP;
    let rounded = if cycles - low > high - cycles { high } else { low };
    rounded.max(RAMP_CYCLES_STEP)
}

// ---------------------------------------------------------------------------
// Hold release and advance
// ---------------------------------------------------------------------------

/// Side effects of [`advance_division`] the scheduler must act on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    /// Lamps that finished stopping and are now fully dark.
    pub darkened: usize,
    /// One of them is the lamp currently being multiplexed.
    pub kill_current: bool,
}

/// Apply the hold/advance rules for the division just entered.
pub fn advance_division(registry: &mut LampRegistry, division: u8, current: Wiring) -> Advance {
    let check_rev = division == DIV_REV_START || division == DIV_REV_STOP;

    let to_stop = registry.any(|l| l.flags.stopping);
    let to_start = !to_stop && registry.any(|l| l.flags.starting && l.flags.alternate == check_rev);
    let to_release = matches!(division, DIV_STOP | DIV_REV_STOP | DIV_HOLD_STOP | DIV_REV_HOLD_STOP)
        && registry.any(|l| l.flags.hold && !l.flags.alternate);
    let to_release_alt = matches!(division, DIV_REV_STOP | DIV_REV_HOLD_STOP)
        && registry.any(|l| l.flags.hold && l.flags.alternate);

    let mut out = Advance::default();
    match division {
        DIV_START if to_start => advance_starts(registry, false),
        DIV_STOP => {
            if to_stop {
                out = advance_stops(registry, false, current);
            }
            if to_release && !held_stop(registry, false) {
                release(registry, false, |l| l.flags.starting);
            }
        }
        DIV_REV_START if to_start => advance_starts(registry, true),
        DIV_REV_STOP => {
            if to_stop {
                out = advance_stops(registry, true, current);
            }
            if to_release_alt && !held_stop(registry, true) {
                release(registry, true, |l| l.flags.starting);
            }
        }
        DIV_HOLD_STOP if to_release => release(registry, false, |l| l.flags.stopping),
        DIV_REV_HOLD_STOP if to_release_alt => release(registry, true, |l| l.flags.stopping),
        _ => {}
    }

    trace!("division {division}: stop={to_stop} start={to_start} darkened={}", out.darkened);
    out
}

fn held_stop(registry: &LampRegistry, alternate: bool) -> bool {
    registry.any(|l| l.flags.hold && l.flags.stopping && l.flags.alternate == alternate)
}

/// Starting lamps of one phase, no longer held, become steadily lit.
fn advance_starts(registry: &mut LampRegistry, alternate: bool) {
    for lamp in registry.iter_mut() {
        if lamp.flags.starting && !lamp.flags.hold && lamp.flags.alternate == alternate {
            lamp.flags.starting = false;
        }
    }
}

/// Stopping lamps of one phase, no longer held, go dark.  A lamp that is
/// also starting (a multi-color LED changing color) only drops the stop.
fn advance_stops(registry: &mut LampRegistry, alternate: bool, current: Wiring) -> Advance {
    let mut out = Advance::default();
    for lamp in registry.iter_mut() {
        if !lamp.flags.stopping || lamp.flags.hold || lamp.flags.alternate != alternate {
            continue;
        }
        if lamp.flags.starting {
            lamp.flags.stopping = false;
        } else {
            lamp.flags.go_dark();
            out.darkened += 1;
            out.kill_current |= lamp.wiring == current;
        }
    }
    out
}

fn release(registry: &mut LampRegistry, alternate: bool, which: impl Fn(&Lamp) -> bool) {
    for lamp in registry.iter_mut() {
        if lamp.flags.hold && which(lamp) && lamp.flags.alternate == alternate {
            lamp.flags.hold = false;
        }
    }
}
