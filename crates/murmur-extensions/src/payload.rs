use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

use murmur_core::Platform;

/// The value delivered back to a command-bus caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandReply {
    Ok { data: serde_json::Value },
    /// No handler claimed the command on the caller's platform.
    NotFound,
}

impl CommandReply {
    pub fn ok(data: serde_json::Value) -> Self {
        Self::Ok { data }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplyError {
    #[error("reply slot already resolved")]
    AlreadyResolved,
}

/// Single-slot, single-use reply handle.
///
/// Exactly one `resolve` succeeds per slot; every later attempt reports
/// [`ReplyError::AlreadyResolved`]. The waiting side is a plain oneshot
/// receiver the caller awaits directly — there is no polling loop anywhere.
pub struct ReplySlot {
    tx: Mutex<Option<oneshot::Sender<CommandReply>>>,
}

impl ReplySlot {
    /// Create a slot and the receiver its owner will await.
    pub fn channel() -> (Self, oneshot::Receiver<CommandReply>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Deliver the reply. A caller that already gave up (dropped its
    /// receiver) is not an error — the reply is simply discarded.
    pub fn resolve(&self, reply: CommandReply) -> Result<(), ReplyError> {
        let tx = self
            .tx
            .lock()
            .unwrap()
            .take()
            .ok_or(ReplyError::AlreadyResolved)?;
        if tx.send(reply).is_err() {
            tracing::debug!("reply receiver dropped before resolution");
        }
        Ok(())
    }

    pub fn is_resolved(&self) -> bool {
        self.tx.lock().unwrap().is_none()
    }
}

impl std::fmt::Debug for ReplySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplySlot")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// One inbound control-plane command and its private reply slot.
#[derive(Debug)]
pub struct CommandPayload {
    pub command: String,
    pub platform: Platform,
    pub data: serde_json::Value,
    pub reply: ReplySlot,
}

impl CommandPayload {
    /// Build a payload plus the receiver for its reply.
    pub fn new(
        command: impl Into<String>,
        platform: Platform,
        data: serde_json::Value,
    ) -> (Self, oneshot::Receiver<CommandReply>) {
        let (reply, rx) = ReplySlot::channel();
        (
            Self {
                command: command.into(),
                platform,
                data,
                reply,
            },
            rx,
        )
    }
}
