//! Cross-context command queue.
//!
//! The scheduler state is owned by one execution context.  Anything else
//! (an interrupt handler, an async task reading a serial link) enqueues
//! [`SignalCommand`]s here without blocking; the owner drains the queue
//! between ticks with
//! [`SignalService::drain_commands`](super::service::SignalService::drain_commands).
//!
//! ```text
//! ┌──────────────┐ SignalCommand ┌───────────────┐
//! │  ISR / task  │──────────────▶│  update loop  │
//! └──────────────┘   try_send    └───────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use super::commands::SignalCommand;

/// Queue depth.  A full queue rejects the command at the sender.
pub const COMMAND_DEPTH: usize = 16;

pub type CommandChannel = Channel<CriticalSectionRawMutex, SignalCommand, COMMAND_DEPTH>;

/// Shared inbound queue for single-service firmware.
pub static COMMAND_CHANNEL: CommandChannel = Channel::new();
