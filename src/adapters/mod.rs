//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements          | Connects to                |
//! |-------------|---------------------|----------------------------|
//! | `log_sink`  | EventSink           | `log` facade               |
//! | `sim_pins`  | PinDriver, DelayNs  | In-memory pin table        |
//! | `time`      | Clock               | Host monotonic clock       |
//!
//! Target boards supply their own `PinDriver` over the GPIO HAL they use.

pub mod log_sink;
pub mod sim_pins;
pub mod time;
