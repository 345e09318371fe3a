//! murmur-pipeline — the messaging orchestrator.
//!
//! One pipeline turns `(platform, room, sender, message)` into a reply,
//! shared by every transport adapter. The caller only handles
//! adapter-specific formatting; stage ordering, persistence, and extension
//! coordination all live here, once.

pub mod completion;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod orchestrator;
pub mod rooms;

pub use completion::{Completion, CompletionError, CompletionGateway};
pub use dispatch::TriggerHandles;
pub use error::{PipelineError, Result};
pub use orchestrator::{Orchestrator, TurnOutcome};
pub use rooms::RoomGate;
