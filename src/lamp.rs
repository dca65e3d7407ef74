//! Lamp records: identity, wiring, color, and per-lamp state flags.
//!
//! A lamp is one physical LED.  Its position is the caller-assigned
//! `(mast, head, lamp)` ordinal triple, which is *not* unique: a bi-color or
//! tri-lead LED is registered as two lamps at the same position with
//! different colors, and commands addressing the position reach both.

use crate::pins::Wiring;

// ═══════════════════════════════════════════════════════════════
//  Colors
// ═══════════════════════════════════════════════════════════════

/// Lamp color code.
///
/// Codes `1..=127` are basic colors usable with the color-selection
/// commands.  The four composite codes describe one half of a two-LED
/// position that shows yellow when both halves are lit.  The code space is
/// open: an unnamed basic code is valid and simply matches only lamps
/// registered with the same code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u8);

impl Color {
    /// No lamp.  Only meaningful as a selection request (clears the head).
    pub const DARK: Self = Self(0);

    pub const RED: Self = Self(1);
    pub const YELLOW: Self = Self(2);
    /// Often blue-green on the prototype, still called green.
    pub const GREEN: Self = Self(3);
    pub const LUNAR: Self = Self(4);
    pub const WHITE: Self = Self::LUNAR;

    pub const BLUE: Self = Self(5);
    pub const PURPLE: Self = Self(6);
    pub const VIOLET: Self = Self::PURPLE;
    pub const ORANGE: Self = Self(7);
    pub const AMBER: Self = Self(8);
    pub const PINK: Self = Self(9);

    /// Highest code accepted by the color-selection commands.
    pub const LAST_SETTABLE: Self = Self(127);

    /// Green half of a two-LED position that mixes to yellow.
    pub const GREEN_YELLOW: Self = Self(188);
    /// Red half of a two-LED position that mixes to yellow.
    pub const RED_YELLOW: Self = Self(189);
    /// Green polarity of a bi-color LED driven alternately for yellow.
    pub const GREEN_RED_YELLOW: Self = Self(198);
    /// Red polarity of a bi-color LED driven alternately for yellow.
    pub const RED_GREEN_YELLOW: Self = Self(199);

    pub const fn code(self) -> u8 {
        self.0
    }

    pub const fn is_dark(self) -> bool {
        self.0 == Self::DARK.0
    }

    /// Whether this code may be passed to a color-selection command.
    pub const fn is_settable(self) -> bool {
        self.0 <= Self::LAST_SETTABLE.0
    }

    pub const fn is_composite(self) -> bool {
        matches!(
            self,
            Self::GREEN_YELLOW | Self::RED_YELLOW | Self::GREEN_RED_YELLOW | Self::RED_GREEN_YELLOW
        )
    }

    /// Does a lamp registered with `self` answer a request for `requested`?
    pub const fn answers(self, requested: Self) -> bool {
        if self.0 == requested.0 {
            return true;
        }
        match requested {
            Self::YELLOW => self.is_composite(),
            Self::GREEN => matches!(self, Self::GREEN_YELLOW | Self::GREEN_RED_YELLOW),
            Self::RED => matches!(self, Self::RED_YELLOW | Self::RED_GREEN_YELLOW),
            _ => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Lamp flags
// ═══════════════════════════════════════════════════════════════

/// Mutable per-lamp state.
///
/// `lit` stays true for the whole time a lamp is conceptually on, including
/// dark flash phases and ramps.  `ramp` is a configuration toggle and
/// survives [`go_dark`](Self::go_dark); everything else is transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LampFlags {
    pub lit: bool,
    pub flashing: bool,
    /// Flashes on the opposite half of the flash interval.
    pub alternate: bool,
    pub starting: bool,
    pub stopping: bool,
    /// Uses the intensity ramp rather than switching hard.
    pub ramp: bool,
    /// Pending start/stop held until the next release division.
    pub hold: bool,
}

impl Default for LampFlags {
    fn default() -> Self {
        Self {
            lit: false,
            flashing: false,
            alternate: false,
            starting: false,
            stopping: false,
            ramp: true,
            hold: false,
        }
    }
}

impl LampFlags {
    /// Begin the lighting sequence (held until the next release division).
    pub fn begin_start(&mut self) {
        self.stopping = false;
        self.starting = true;
        self.lit = true;
        self.hold = true;
    }

    /// Begin a ramped shutdown (held until the next release division).
    pub fn begin_stop(&mut self) {
        self.stopping = true;
        self.starting = false;
        self.hold = true;
    }

    /// Fully, stably dark.  Keeps the `ramp` preference.
    pub fn go_dark(&mut self) {
        *self = Self {
            ramp: self.ramp,
            ..Self::default()
        };
    }

    /// Started but never released from hold: nothing was ever shown.
    pub const fn never_shown(&self) -> bool {
        self.lit && self.starting && self.hold
    }
}

// ═══════════════════════════════════════════════════════════════
//  Lamp record
// ═══════════════════════════════════════════════════════════════

/// Index of a lamp in the registry arena.  Index 0 is the dark sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LampId(pub(crate) u8);

impl LampId {
    pub const SENTINEL: Self = Self(0);

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// One registered LED.
#[derive(Debug, Clone, Copy)]
pub struct Lamp {
    pub mast: u8,
    pub head: u8,
    pub lamp: u8,
    pub color: Color,
    pub wiring: Wiring,
    pub flags: LampFlags,
}

impl Lamp {
    pub fn new(mast: u8, head: u8, lamp: u8, wiring: Wiring, color: Color) -> Self {
        Self {
            mast,
            head,
            lamp,
            color,
            wiring,
            flags: LampFlags::default(),
        }
    }

    /// The permanently dark end-of-scan lamp.
    pub fn sentinel() -> Self {
        let mut lamp = Self::new(0, 0, 0, Wiring::none(), Color::DARK);
        lamp.flags.ramp = false;
        lamp
    }

    pub const fn is_at(&self, mast: u8, head: u8) -> bool {
        self.mast == mast && self.head == head
    }

    pub const fn is_at_lamp(&self, mast: u8, head: u8, lamp: u8) -> bool {
        self.is_at(mast, head) && self.lamp == lamp
    }
}
