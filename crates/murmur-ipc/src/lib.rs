//! murmur-ipc — the command bus.
//!
//! Control-plane requests from every adapter funnel into one shared inbound
//! queue with a single consumer task. Each caller holds a private one-shot
//! reply slot, which is how a synchronous-looking request/response API is
//! built on top of a single-consumer asynchronous pipe.

pub mod bus;
pub mod error;

pub use bus::{CommandBus, IpcHandle};
pub use error::{IpcError, Result};
