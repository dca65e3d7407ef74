//! Charlieplex bank guard.
//!
//! Every anode/cathode transition goes through the guard, which keeps a
//! running count of live pins per bank.  Two live anodes or two live
//! cathodes would light LEDs nobody asked for and can overload a pin, so
//! the guard refuses to energize a second pin and reports a [`BankFault`].
//! A count going negative means the scheduler lost track of what it
//! switched; that is reported the same way.
//!
//! Energizing refuses *before* touching the pin.  De-energizing always
//! releases the pin first (high impedance is the safe state) and reports
//! afterwards.

use embedded_hal::digital::PinState;
use log::error;

use crate::app::ports::PinDriver;
use crate::error::{Bank, BankFault};
use crate::pins::{PinId, PinMode};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BankGuard {
    anodes: i8,
    cathodes: i8,
}

impl BankGuard {
    pub const fn new() -> Self {
        Self {
            anodes: 0,
            cathodes: 0,
        }
    }

    pub const fn active_anodes(&self) -> i8 {
        self.anodes
    }

    pub const fn active_cathodes(&self) -> i8 {
        self.cathodes
    }

    /// Drive `pin` high as the anode.
    pub fn enable_anode(&mut self, pin: PinId, hw: &mut impl PinDriver) -> Result<(), BankFault> {
        if !hw.is_valid_pin(pin) {
            return Ok(());
        }
        Self::count_up(&mut self.anodes, Bank::Anode, pin)?;
        hw.set_mode(pin, PinMode::Output);
        hw.set_level(pin, PinState::High);
        Ok(())
    }

    /// Pull `pin` low as the cathode.
    pub fn enable_cathode(&mut self, pin: PinId, hw: &mut impl PinDriver) -> Result<(), BankFault> {
        if !hw.is_valid_pin(pin) {
            return Ok(());
        }
        Self::count_up(&mut self.cathodes, Bank::Cathode, pin)?;
        hw.set_mode(pin, PinMode::Output);
        hw.set_level(pin, PinState::Low);
        Ok(())
    }

    pub fn disable_anode(&mut self, pin: PinId, hw: &mut impl PinDriver) -> Result<(), BankFault> {
        if !hw.is_valid_pin(pin) {
            return Ok(());
        }
        hw.set_mode(pin, PinMode::Input);
        Self::count_down(&mut self.anodes, Bank::Anode, pin)
    }

    pub fn disable_cathode(&mut self, pin: PinId, hw: &mut impl PinDriver) -> Result<(), BankFault> {
        if !hw.is_valid_pin(pin) {
            return Ok(());
        }
        hw.set_mode(pin, PinMode::Input);
        Self::count_down(&mut self.cathodes, Bank::Cathode, pin)
    }

    fn count_up(count: &mut i8, bank: Bank, pin: PinId) -> Result<(), BankFault> {
        let next = *count + 1;
        if next > 1 {
            error!("SAFETY | second {bank} requested on pin {pin}, refusing");
            return Err(BankFault { bank, pin, active: next });
        }
        *count = next;
        Ok(())
    }

    fn count_down(count: &mut i8, bank: Bank, pin: PinId) -> Result<(), BankFault> {
        *count -= 1;
        if *count < 0 {
            let active = *count;
            *count = 0;
            error!("SAFETY | {bank} bank underflow releasing pin {pin}");
            return Err(BankFault { bank, pin, active });
        }
        Ok(())
    }
}
