//! Signal core — pure scheduling logic, zero I/O.
//!
//! This module holds the command surface for the lamp driver: lamp
//! lifecycle transitions, the per-tick update, and the queue other
//! contexts use to reach it.  All interaction with hardware happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real pins.

pub mod channels;
pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
