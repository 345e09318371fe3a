use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use murmur_core::Platform;
use murmur_extensions::{CommandPayload, CommandReply, Extension, ExtensionRegistry, IpcCommand};

use crate::error::{IpcError, Result};

/// Default depth of the shared inbound queue.
const DEFAULT_QUEUE_DEPTH: usize = 256;

/// Caller-side handle: enqueue a command, await the private reply slot.
///
/// Cheap to clone; every adapter (HTTP ingress, text server, chat client)
/// holds one.
#[derive(Clone)]
pub struct IpcHandle {
    tx: mpsc::Sender<CommandPayload>,
}

impl IpcHandle {
    /// Submit a command and wait for exactly one reply.
    ///
    /// Returns [`IpcError::ReplyDropped`] when a matching handler failed
    /// before resolving the slot — the request died with it. There is no
    /// timeout here: a handler that matches but never resolves leaves the
    /// caller waiting.
    pub async fn request(
        &self,
        command: impl Into<String>,
        platform: Platform,
        data: serde_json::Value,
    ) -> Result<CommandReply> {
        let (payload, rx) = CommandPayload::new(command, platform, data);
        self.tx
            .send(payload)
            .await
            .map_err(|_| IpcError::BusClosed)?;
        rx.await.map_err(|_| IpcError::ReplyDropped)
    }
}

/// The single logical consumer of the shared inbound queue.
///
/// Dispatches each payload to every matching [`IpcCommand`] extension in
/// registration order. Extensions are trusted to resolve the payload's reply
/// slot exactly once; only the zero-match case is resolved by the bus itself.
///
/// [`IpcCommand`]: murmur_extensions::IpcCommand
pub struct CommandBus {
    registry: Arc<ExtensionRegistry>,
    rx: mpsc::Receiver<CommandPayload>,
}

impl CommandBus {
    /// Build the bus and its caller handle.
    pub fn new(registry: Arc<ExtensionRegistry>) -> (IpcHandle, Self) {
        Self::with_capacity(registry, DEFAULT_QUEUE_DEPTH)
    }

    pub fn with_capacity(registry: Arc<ExtensionRegistry>, capacity: usize) -> (IpcHandle, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (IpcHandle { tx }, Self { registry, rx })
    }

    /// Consume the queue until every handle is dropped.
    ///
    /// A handler error fails that one request (its reply slot is dropped
    /// unresolved, waking the caller with `ReplyDropped`) and is logged; the
    /// loop always moves on to the next payload.
    pub async fn run(mut self) {
        while let Some(payload) = self.rx.recv().await {
            let command = payload.command.clone();
            if let Err(e) = self.submit(payload).await {
                warn!(command = %command, error = %e, "ipc command handler failed");
            }
        }
        debug!("command bus queue closed, consumer exiting");
    }

    /// Route one payload through all matching handlers.
    ///
    /// Multiple matches are allowed and all run — several extensions may
    /// listen for the same command on different platforms, and the caller
    /// only ever reads its own slot. Zero matches resolve the slot with
    /// [`CommandReply::NotFound`], exactly once.
    pub async fn submit(&self, payload: CommandPayload) -> murmur_core::Result<()> {
        let mut hits = 0usize;
        for ext in self.registry.ipc_commands() {
            if !ext.platform_supported(&payload.platform) {
                continue;
            }
            if !ext.ipc_commands().iter().any(|c| c == &payload.command) {
                continue;
            }
            debug!(
                command = %payload.command,
                platform = %payload.platform,
                handler = ext.name(),
                "dispatching ipc command"
            );
            ext.handle(&payload).await?;
            hits += 1;
        }

        if hits == 0 {
            debug!(command = %payload.command, "no handlers found for ipc command");
            // The slot is fresh — this resolve cannot have been preceded.
            let _ = payload.reply.resolve(CommandReply::NotFound);
        }
        Ok(())
    }
}
