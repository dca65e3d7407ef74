//! Lineside signal lamp driver.
//!
//! Drives model-railroad signal heads whose LEDs are charlieplexed: each
//! LED sits between an anode and a cathode pin, and at most one pin of each
//! bank is ever driven.  The crate multiplexes every lit lamp in turn,
//! ramps intensity on start and stop, flashes and alternates lamps, and
//! adapts the pulse width to the measured loop cost.
//!
//! Hardware reaches the core only through the traits in [`app::ports`],
//! so everything here runs on the host against the [`adapters`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod division;
pub mod lamp;
pub mod ramp;
pub mod registry;
pub mod safety;
pub mod scheduler;
pub mod timing;

mod error;
mod pins;

pub use app::service::SignalService;
pub use config::SignalConfig;
pub use error::{Bank, BankFault, Error, Result};
pub use lamp::{Color, Lamp, LampFlags, LampId};
pub use pins::{NOT_PIN, PIN_LIMIT, PinId, PinMode, Wiring};
