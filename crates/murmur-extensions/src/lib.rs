//! murmur-extensions — the pluggable-behavior contract.
//!
//! Every unit of pluggable behavior implements exactly one capability trait
//! from [`capability`]; constructed instances are collected into an
//! [`registry::ExtensionRegistry`] at startup and frozen. The registry is an
//! owned value handed to the orchestrator and command bus — there is no
//! global state and no runtime discovery.

pub mod capability;
pub mod payload;
pub mod registry;
pub mod reply;

pub use capability::{
    CommandProcessor, ContextProvider, ConversationalTrigger, Extension, FrameworkExtension,
    IpcCommand, MessageHandler, ResponsePreprocessor, Retrieval, RetrievalAugmenter,
};
pub use payload::{CommandPayload, CommandReply, ReplyError, ReplySlot};
pub use registry::{ExtensionRegistry, RegistryBuilder};
pub use reply::Reply;
