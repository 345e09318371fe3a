use async_trait::async_trait;
use thiserror::Error;

use murmur_core::ChatMessage;

/// A successful model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("http error: {0}")]
    Http(String),

    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

/// External collaborator producing a model-generated reply from a context
/// list.
///
/// A failure here never fails a turn: the orchestrator substitutes a fixed
/// `"Error"` reply so the user always receives something.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, context: &[ChatMessage]) -> Result<Completion, CompletionError>;
}
