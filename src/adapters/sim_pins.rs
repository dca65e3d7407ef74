//! In-memory pin driver for simulation and host tests.
//!
//! Keeps a mode/level table for every pin the default validity check
//! accepts and watches the electrical picture after each write.  A current
//! path exists between every output driven high and every output driven
//! low; on a healthy charlieplex there is never more than one.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;

use crate::app::ports::PinDriver;
use crate::pins::{PIN_LIMIT, PinId, PinMode};

/// State of one simulated pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPin {
    pub mode: PinMode,
    pub level: PinState,
}

impl SimPin {
    const RESET: Self = Self {
        mode: PinMode::Input,
        level: PinState::Low,
    };

    pub fn is_high(self) -> bool {
        self.mode == PinMode::Output && self.level == PinState::High
    }

    pub fn is_low(self) -> bool {
        self.mode == PinMode::Output && self.level == PinState::Low
    }
}

pub struct SimPinDriver {
    pins: [SimPin; PIN_LIMIT as usize],
    highs: usize,
    lows: usize,
    peak_paths: usize,
    writes: usize,
    delayed_ns: u64,
}

impl Default for SimPinDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimPinDriver {
    pub fn new() -> Self {
        Self {
            pins: [SimPin::RESET; PIN_LIMIT as usize],
            highs: 0,
            lows: 0,
            peak_paths: 0,
            writes: 0,
            delayed_ns: 0,
        }
    }

    pub fn pin(&self, pin: PinId) -> Option<SimPin> {
        self.pins.get(pin as usize).copied()
    }

    pub fn driven_high(&self) -> impl Iterator<Item = PinId> + '_ {
        (0..PIN_LIMIT).filter(|&p| self.pins[p as usize].is_high())
    }

    pub fn driven_low(&self) -> impl Iterator<Item = PinId> + '_ {
        (0..PIN_LIMIT).filter(|&p| self.pins[p as usize].is_low())
    }

    /// Number of high/low output pairs, i.e. LEDs that could be conducting.
    pub fn current_paths(&self) -> usize {
        self.highs * self.lows
    }

    /// The single conducting `(anode, cathode)` pair, if exactly one exists.
    pub fn lit(&self) -> Option<(PinId, PinId)> {
        let mut high = self.driven_high();
        let mut low = self.driven_low();
        match (high.next(), high.next(), low.next(), low.next()) {
            (Some(a), None, Some(c), None) => Some((a, c)),
            _ => None,
        }
    }

    /// Worst `current_paths` seen after any single write.
    pub fn peak_paths(&self) -> usize {
        self.peak_paths
    }

    /// Mode and level writes since construction.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn delayed_us(&self) -> u64 {
        self.delayed_ns / 1000
    }

    fn write(&mut self, pin: PinId, change: impl FnOnce(&mut SimPin)) {
        let Some(p) = self.pins.get_mut(pin as usize) else {
            return;
        };
        let before = *p;
        change(p);
        let after = *p;

        self.highs = self.highs + usize::from(after.is_high()) - usize::from(before.is_high());
        self.lows = self.lows + usize::from(after.is_low()) - usize::from(before.is_low());
        self.writes += 1;
        self.peak_paths = self.peak_paths.max(self.current_paths());
    }
}

impl PinDriver for SimPinDriver {
    fn set_mode(&mut self, pin: PinId, mode: PinMode) {
        self.write(pin, |p| p.mode = mode);
    }

    fn set_level(&mut self, pin: PinId, level: PinState) {
        self.write(pin, |p| p.level = level);
    }
}

impl DelayNs for SimPinDriver {
    fn delay_ns(&mut self, ns: u32) {
        self.delayed_ns += u64::from(ns);
    }
}
