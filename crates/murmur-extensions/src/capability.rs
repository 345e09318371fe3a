use async_trait::async_trait;

use murmur_core::{ChatMessage, Platform, Result, Role};
use murmur_threads::ChatThread;

use crate::payload::CommandPayload;
use crate::reply::Reply;

/// Common surface of every pluggable unit.
///
/// Implementations must be `Send + Sync` so they can live behind `Arc` in a
/// registry shared across Tokio tasks.
pub trait Extension: Send + Sync {
    /// Stable identifier, used in logs and config enumeration.
    fn name(&self) -> &str;

    /// Platforms this unit applies to. Empty means "all".
    fn platforms(&self) -> &[Platform];

    /// True iff the declared platform set is empty or contains `platform`.
    fn platform_supported(&self, platform: &Platform) -> bool {
        self.platforms().is_empty() || self.platforms().contains(platform)
    }
}

/// Intercepts whole messages that match one of its command strings.
///
/// A non-`None` result short-circuits the rest of the turn pipeline.
#[async_trait]
pub trait CommandProcessor: Extension {
    fn commands(&self) -> &[String];

    async fn process(
        &self,
        message: &str,
        room_id: &str,
        user_id: &str,
    ) -> Result<Option<Vec<Reply>>>;
}

/// Reacts to trigger words in assistant output, off the critical path.
#[async_trait]
pub trait ConversationalTrigger: Extension {
    fn triggers(&self) -> &[String];

    /// System entries describing this trigger to the model.
    fn get_context(&self, user_id: &str) -> Vec<ChatMessage>;

    async fn process(&self, message: &str, role: Role, room_id: &str, user_id: &str) -> Result<()>;
}

/// Contributes system entries to the completion primer.
pub trait ContextProvider: Extension {
    fn get_context(&self, user_id: &str) -> Vec<ChatMessage>;
}

/// Handles inbound events of a declared message type (text, media, …).
#[async_trait]
pub trait MessageHandler: Extension {
    fn message_types(&self) -> &[String];

    async fn handle(
        &self,
        platform: &Platform,
        room_id: &str,
        sender: &str,
        message: &str,
        message_context: Option<Vec<ChatMessage>>,
    ) -> Result<Option<Vec<Reply>>>;
}

/// What a retrieval pass produced: fragments for the completion envelope
/// and structured side-effect replies for transports that can render them.
#[derive(Debug, Default)]
pub struct Retrieval {
    pub fragments: Vec<ChatMessage>,
    pub side_effects: Vec<Reply>,
}

/// Pulls external knowledge relevant to the user message before completion.
#[async_trait]
pub trait RetrievalAugmenter: Extension {
    /// Storage key under which this augmenter caches retrieved context.
    fn cache_key(&self) -> &str;

    async fn retrieve(&self, sender: &str, message: &str, thread: &ChatThread)
        -> Result<Retrieval>;
}

/// Transforms the assistant reply after it has been persisted.
///
/// Preprocessors read the previous stage's output from the stored thread
/// (the pipeline persists before this stage runs) and return the text to
/// feed forward. State mutations must be idempotent.
#[async_trait]
pub trait ResponsePreprocessor: Extension {
    async fn preprocess(&self, room_id: &str, user_id: &str) -> Result<String>;
}

/// Handles control-plane commands off the command bus.
///
/// A matching handler MUST resolve `payload.reply` exactly once, either
/// directly or by delegating deeper into the system.
#[async_trait]
pub trait IpcCommand: Extension {
    fn ipc_commands(&self) -> &[String];

    async fn handle(&self, payload: &CommandPayload) -> Result<()>;
}

/// Startup-time hook for units that need one-off initialisation.
#[async_trait]
pub trait FrameworkExtension: Extension {
    async fn setup(&self) -> Result<()>;
}
