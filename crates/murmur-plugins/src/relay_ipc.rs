use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tracing::debug;

use murmur_core::{Platform, Result};
use murmur_extensions::{CommandPayload, CommandReply, Extension, IpcCommand};
use murmur_pipeline::Orchestrator;

/// Late-bound pipeline reference.
///
/// The registry (which contains this extension) is frozen before the
/// orchestrator that consumes it exists, so the orchestrator is injected
/// into this slot right after construction, still during startup.
pub type PipelineSlot = Arc<OnceLock<Arc<Orchestrator>>>;

/// `relay_message` — drive a full pipeline turn from the control plane.
///
/// Lets an operator (or an automation hook) speak into a room as a user and
/// get the assistant's reply back over the bus. This is the "delegate
/// further" shape of IPC handling: the reply slot is resolved with whatever
/// the orchestrator produced.
pub struct RelayIpc {
    commands: Vec<String>,
    pipeline: PipelineSlot,
}

impl RelayIpc {
    pub fn new(pipeline: PipelineSlot) -> Self {
        Self {
            commands: vec!["relay_message".to_string()],
            pipeline,
        }
    }
}

impl Extension for RelayIpc {
    fn name(&self) -> &str {
        "relay_ipc"
    }

    fn platforms(&self) -> &[Platform] {
        &[]
    }
}

#[async_trait]
impl IpcCommand for RelayIpc {
    fn ipc_commands(&self) -> &[String] {
        &self.commands
    }

    async fn handle(&self, payload: &CommandPayload) -> Result<()> {
        let Some(orchestrator) = self.pipeline.get() else {
            let _ = payload.reply.resolve(CommandReply::ok(serde_json::json!({
                "error": "pipeline not ready",
            })));
            return Ok(());
        };

        let room_id = payload.data.get("room_id").and_then(|v| v.as_str());
        let sender = payload.data.get("sender").and_then(|v| v.as_str());
        let message = payload.data.get("message").and_then(|v| v.as_str());

        let (Some(room_id), Some(sender), Some(message)) = (room_id, sender, message) else {
            let _ = payload.reply.resolve(CommandReply::ok(serde_json::json!({
                "error": "relay_message requires room_id, sender, and message",
            })));
            return Ok(());
        };

        debug!(room_id, sender, "relaying message through the pipeline");
        let outcome = orchestrator
            .handle_message(&payload.platform, room_id, sender, message, None)
            .await
            .map_err(|e| murmur_core::MurmurError::Extension {
                extension: "relay_ipc".into(),
                reason: e.to_string(),
            })?;
        outcome.triggers.detach();

        let _ = payload.reply.resolve(CommandReply::ok(serde_json::json!({
            "response": outcome.text,
            "side_effects": outcome.side_effects,
        })));
        Ok(())
    }
}
