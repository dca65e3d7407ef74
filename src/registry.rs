//! Lamp arena.
//!
//! Lamps live in a fixed-capacity `heapless::Vec` and are never removed.
//! Slot 0 holds the permanently dark sentinel, so the scheduler cursor
//! always points at a valid record even when nothing is lit.  Real lamps
//! occupy slots `1..len`, in registration order.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;
use heapless::Vec;
use log::debug;

use crate::app::ports::PinDriver;
use crate::lamp::{Color, Lamp, LampId};
use crate::pins::{PinMode, Wiring};

/// Arena capacity, sentinel included.
pub const MAX_LAMPS: usize = 64;

pub struct LampRegistry {
    lamps: Vec<Lamp, MAX_LAMPS>,
}

impl Default for LampRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LampRegistry {
    pub fn new() -> Self {
        let mut lamps = Vec::new();
        // Capacity is non-zero, the first push cannot fail.
        let _ = lamps.push(Lamp::sentinel());
        Self { lamps }
    }

    /// Add a lamp and drain any residual charge from its pins.
    ///
    /// Returns `None` (and touches no pin) for identical or invalid pins, a
    /// dark color, or a full arena.
    pub fn register(
        &mut self,
        mast: u8,
        head: u8,
        lamp: u8,
        wiring: Wiring,
        color: Color,
        settle_us: u32,
        hw: &mut (impl PinDriver + DelayNs),
    ) -> Option<LampId> {
        if wiring.anode == wiring.cathode {
            debug!("register M{mast} H{head} L{lamp}: anode and cathode are both pin {}", wiring.anode);
            return None;
        }
        if !hw.is_valid_pin(wiring.anode) || !hw.is_valid_pin(wiring.cathode) {
            debug!(
                "register M{mast} H{head} L{lamp}: invalid pins {}/{}",
                wiring.anode, wiring.cathode
            );
            return None;
        }
        if color.is_dark() {
            debug!("register M{mast} H{head} L{lamp}: dark lamps need no entry");
            return None;
        }
        if self.lamps.is_full() {
            debug!("register M{mast} H{head} L{lamp}: arena full ({MAX_LAMPS})");
            return None;
        }

        let id = LampId(self.lamps.len() as u8);
        let _ = self.lamps.push(Lamp::new(mast, head, lamp, wiring, color));
        drain(wiring, settle_us, hw);
        Some(id)
    }

    /// Total slots in use, sentinel included.
    pub fn len(&self) -> usize {
        self.lamps.len()
    }

    /// `true` when only the sentinel is present.
    pub fn is_empty(&self) -> bool {
        self.lamps.len() <= 1
    }

    pub fn get(&self, id: LampId) -> Option<&Lamp> {
        self.lamps.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: LampId) -> Option<&mut Lamp> {
        self.lamps.get_mut(id.index())
    }

    /// Record at arena slot `idx`, falling back to the sentinel.
    pub(crate) fn slot(&self, idx: usize) -> &Lamp {
        self.lamps.get(idx).unwrap_or(&self.lamps[0])
    }

    /// Every real lamp with its id.
    pub fn iter(&self) -> impl Iterator<Item = (LampId, &Lamp)> {
        self.lamps
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, l)| (LampId(i as u8), l))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Lamp> {
        self.lamps.iter_mut().skip(1)
    }

    /// Lamps on one head.
    pub fn find(&self, mast: u8, head: u8) -> impl Iterator<Item = (LampId, &Lamp)> {
        self.iter().filter(move |(_, l)| l.is_at(mast, head))
    }

    /// Lamps at one position.  More than one for multi-color LEDs.
    pub fn find_lamp(
        &self,
        mast: u8,
        head: u8,
        lamp: u8,
    ) -> impl Iterator<Item = (LampId, &Lamp)> {
        self.iter().filter(move |(_, l)| l.is_at_lamp(mast, head, lamp))
    }

    /// Mutable lamps on a head, optionally narrowed to one lamp ordinal.
    pub(crate) fn matching_mut(
        &mut self,
        mast: u8,
        head: u8,
        lamp: Option<u8>,
    ) -> impl Iterator<Item = &mut Lamp> {
        self.iter_mut()
            .filter(move |l| l.is_at(mast, head) && lamp.is_none_or(|n| l.lamp == n))
    }

    pub fn count_lit(&self) -> usize {
        self.iter().filter(|(_, l)| l.flags.lit).count()
    }

    pub(crate) fn any(&self, pred: impl Fn(&Lamp) -> bool) -> bool {
        self.iter().any(|(_, l)| pred(l))
    }

    /// Next lit slot after `cursor`, scanning forward and wrapping once.
    ///
    /// The second value is `true` when the scan passed the end of the arena,
    /// i.e. a full multiplex pass completed.  `None` means nothing is lit; the
    /// cursor should stay where it is.
    pub(crate) fn next_lit(&self, cursor: usize) -> (Option<usize>, bool) {
        let len = self.lamps.len();
        let cursor = cursor.min(len - 1);
        let mut wrapped = false;
        let mut idx = cursor;
        loop {
            idx += 1;
            if idx >= len {
                idx = 0;
                wrapped = true;
            }
            if self.lamps[idx].flags.lit {
                return (Some(idx), wrapped);
            }
            if idx == cursor {
                return (None, wrapped);
            }
        }
    }
}

/// Ground each pin briefly, then leave both in high impedance.
fn drain(wiring: Wiring, settle_us: u32, hw: &mut (impl PinDriver + DelayNs)) {
    hw.set_mode(wiring.cathode, PinMode::Input);
    hw.set_mode(wiring.anode, PinMode::Output);
    hw.set_level(wiring.anode, PinState::Low);
    hw.delay_us(settle_us);
    hw.set_mode(wiring.anode, PinMode::Input);
    hw.set_mode(wiring.cathode, PinMode::Output);
    hw.set_level(wiring.cathode, PinState::Low);
    hw.delay_us(settle_us);
    hw.set_mode(wiring.cathode, PinMode::Input);
}
