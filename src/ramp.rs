//! Intensity curve for flashing and ramping lamps.
//!
//! The flash interval is cut into ten divisions.  A lamp that is flashing,
//! starting or stopping is only energized on a subset of its multiplex
//! pulses in the ramp divisions, selected by the global pass counter:
//!
//! ```text
//!  division      0    1    2    3    4    5    6    7    8    9
//!  normal       1/6  1/4  1/2  full full full 1/2  1/4  1/6  dark
//!  alternate    full 1/2  1/4  1/6  dark 1/6  1/4  1/2  full full
//! ```
//!
//! (the alternate row is for a flashing lamp; an alternate lamp that is
//! starting only uses the rising half, a stopping one the falling half).
//! Lamps with ramping disabled switch hard at the same boundaries.
//!
//! The function is pure: it reads flags and counters and mutates nothing.

use crate::lamp::LampFlags;

/// What the scheduler should do with the current lamp for this pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pulse {
    /// Energize the cathode.
    On,
    /// Leave the LED dark this pulse; the anode stays selected.
    Off,
    /// The lamp is no longer lit: drop both banks.
    PowerDown,
}

impl Pulse {
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

const fn duty(on: bool) -> Pulse {
    if on { Pulse::On } else { Pulse::Off }
}

/// Decide whether a lamp should be energized on this multiplex pulse.
///
/// `pass_count` is the number of completed passes since the last division-0
/// restart; the 1/6, 1/4 and 1/2 duty levels are `pass_count % 6`, `% 4` and
/// `% 2` picking one residue.
pub fn pulse(flags: &LampFlags, division: u8, pass_count: u32) -> Pulse {
    if !flags.lit {
        return Pulse::PowerDown;
    }

    let LampFlags {
        flashing,
        alternate,
        starting,
        stopping,
        ramp,
        hold,
        ..
    } = *flags;

    let decision = match division {
        0 => {
            if hold && stopping {
                Pulse::On
            } else if hold || (!alternate && !ramp && (flashing || starting)) {
                Pulse::Off
            } else if !alternate && ramp && (starting || flashing) {
                duty(pass_count % 6 == 0)
            } else {
                Pulse::On
            }
        }
        1 => {
            if !alternate && hold && stopping {
                Pulse::On
            } else if hold || (alternate && !ramp && flashing) {
                Pulse::Off
            } else if !alternate && ramp && (flashing || starting) {
                duty(pass_count % 4 == 0)
            } else if alternate && ramp && (flashing || stopping) {
                duty(pass_count % 2 == 1)
            } else {
                Pulse::On
            }
        }
        2 => {
            if !alternate && hold && stopping {
                Pulse::On
            } else if hold || (alternate && !ramp && flashing) {
                Pulse::Off
            } else if !alternate && ramp && (flashing || starting) {
                duty(pass_count % 2 == 0)
            } else if alternate && ramp && (flashing || stopping) {
                duty(pass_count % 4 == 3)
            } else {
                Pulse::On
            }
        }
        3 => {
            if !alternate && hold && stopping {
                Pulse::On
            } else if hold || (alternate && !ramp && flashing) {
                Pulse::Off
            } else if alternate && ramp && (flashing || stopping) {
                duty(pass_count % 6 == 5)
            } else {
                Pulse::On
            }
        }
        4 => {
            if hold && stopping {
                Pulse::On
            } else if hold || (alternate && (flashing || (ramp && (starting || stopping)))) {
                Pulse::Off
            } else {
                Pulse::On
            }
        }
        5 => {
            if hold && stopping {
                Pulse::On
            } else if hold || (alternate && !ramp && flashing) {
                Pulse::Off
            } else if alternate && ramp && (starting || flashing) {
                duty(pass_count % 6 == 0)
            } else {
                Pulse::On
            }
        }
        6 => {
            if hold && stopping {
                Pulse::On
            } else if hold || (!alternate && !ramp && (flashing || starting || stopping)) {
                Pulse::Off
            } else if alternate && ramp && (flashing || starting) {
                duty(pass_count % 4 == 0)
            } else if !alternate && ramp && (flashing || stopping) {
                duty(pass_count % 2 == 1)
            } else {
                Pulse::On
            }
        }
        7 => {
            if hold && stopping {
                Pulse::On
            } else if hold || (!alternate && !ramp && (flashing || starting || stopping)) {
                Pulse::Off
            } else if alternate && ramp && (flashing || starting) {
                duty(pass_count % 2 == 0)
            } else if !alternate && ramp && (flashing || stopping) {
                duty(pass_count % 4 == 3)
            } else {
                Pulse::On
            }
        }
        8 => {
            if hold && stopping {
                Pulse::On
            } else if hold || (!alternate && !ramp && (flashing || starting || stopping)) {
                Pulse::Off
            } else if !alternate && ramp && (flashing || stopping) {
                duty(pass_count % 6 == 5)
            } else {
                Pulse::On
            }
        }
        9 => {
            if hold && stopping {
                Pulse::On
            } else if hold
                || (!alternate && !ramp && (flashing || starting || stopping))
                || (!alternate && (flashing || (ramp && (starting || stopping))))
            {
                Pulse::Off
            } else {
                Pulse::On
            }
        }
        _ => Pulse::On,
    };

    // held lamps stay dark unless they are holding a stop
    if hold && !stopping { Pulse::Off } else { decision }
}
