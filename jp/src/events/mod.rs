//! Pool event stream
//!
//! Every admission, exit, kill and monitoring pass emits a [`PoolEvent`] on the
//! pool's [`EventBus`]. Consumers subscribe; the CLI prints them.
//!
//! ```text
//!   Pool::submit ──> Started
//!   Pool::wait_for ─> Finished | Killed ... Status
//!          │
//!          ▼
//!     EventBus (tokio broadcast) ──> EventPrinter (stdout text/json, JSONL file)
//! ```

mod bus;
mod printer;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus};
pub use printer::{EventPrinter, spawn_event_printer};
pub use types::{EventLogEntry, PoolEvent};
