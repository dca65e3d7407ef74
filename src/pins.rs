//! Pin identifiers and electrical conventions for charlieplexed lamps.
//!
//! Every lamp is one LED wired between two microcontroller pins.  A pin is
//! never permanently an anode or a cathode: the same pin may source current
//! for one LED and sink it for another.  At any instant the scheduler drives
//! at most one pin as an anode (output, HIGH) and one as a cathode
//! (output, LOW); every other lamp pin sits in high impedance (input).

/// Platform pin number.
pub type PinId = u8;

/// Marker for "no pin" (the sentinel lamp carries this on both ends).
pub const NOT_PIN: PinId = 255;

/// Pins `0..PIN_LIMIT` are accepted by the default validity check.
pub const PIN_LIMIT: PinId = 70;

/// Direction a pin is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// High impedance.  De-energizes whatever LED the pin was part of.
    Input,
    /// Actively driven to the level set with `set_level`.
    Output,
}

/// Default pin validity check used by [`PinDriver`](crate::app::ports::PinDriver).
pub const fn default_pin_valid(pin: PinId) -> bool {
    pin < PIN_LIMIT
}

/// The two pins of one LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wiring {
    /// Pin wired to the LED anode (driven HIGH to light).
    pub anode: PinId,
    /// Pin wired to the LED cathode (driven LOW to light).
    pub cathode: PinId,
}

impl Wiring {
    pub const fn new(anode: PinId, cathode: PinId) -> Self {
        Self { anode, cathode }
    }

    /// Wiring of the permanently dark sentinel lamp.
    pub const fn none() -> Self {
        Self {
            anode: NOT_PIN,
            cathode: NOT_PIN,
        }
    }

    pub const fn is_none(self) -> bool {
        self.anode == NOT_PIN || self.cathode == NOT_PIN
    }
}
