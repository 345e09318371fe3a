use async_trait::async_trait;

use murmur_core::{ChatMessage, Platform, Result};
use murmur_extensions::{Extension, MessageHandler, Reply};

use crate::relay_ipc::PipelineSlot;

/// Default handler for `text` messages on every platform.
///
/// Thin shim between adapters and the pipeline: adapters route inbound
/// events by message type, and this is the type most of them produce.
pub struct TextMessageHandler {
    message_types: Vec<String>,
    pipeline: PipelineSlot,
}

impl TextMessageHandler {
    pub fn new(pipeline: PipelineSlot) -> Self {
        Self {
            message_types: vec!["text".to_string()],
            pipeline,
        }
    }
}

impl Extension for TextMessageHandler {
    fn name(&self) -> &str {
        "text_handler"
    }

    fn platforms(&self) -> &[Platform] {
        &[]
    }
}

#[async_trait]
impl MessageHandler for TextMessageHandler {
    fn message_types(&self) -> &[String] {
        &self.message_types
    }

    async fn handle(
        &self,
        platform: &Platform,
        room_id: &str,
        sender: &str,
        message: &str,
        message_context: Option<Vec<ChatMessage>>,
    ) -> Result<Option<Vec<Reply>>> {
        let Some(orchestrator) = self.pipeline.get() else {
            return Err(murmur_core::MurmurError::Internal(
                "text handler invoked before the pipeline was bound".into(),
            ));
        };

        let outcome = orchestrator
            .handle_message(platform, room_id, sender, message, message_context)
            .await
            .map_err(|e| murmur_core::MurmurError::Extension {
                extension: "text_handler".into(),
                reason: e.to_string(),
            })?;
        outcome.triggers.detach();

        let mut replies = Vec::new();
        // An empty reply is an explicit no-reply; side effects still flow.
        if !outcome.text.is_empty() {
            replies.push(Reply::text(outcome.text));
        }
        replies.extend(outcome.side_effects);

        if replies.is_empty() {
            Ok(None)
        } else {
            Ok(Some(replies))
        }
    }
}
