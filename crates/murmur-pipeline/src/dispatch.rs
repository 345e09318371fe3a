use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

use murmur_core::{Platform, Role};
use murmur_extensions::{ConversationalTrigger, Extension};

/// Handles for one turn's trigger tasks.
///
/// Trigger processing is off the critical path: the orchestrator returns to
/// its caller without waiting. Failures are logged with the extension name
/// rather than silently dropped. `join_with_grace` exists for shutdown paths
/// that want a bounded wait; `detach` is the normal case.
pub struct TriggerHandles {
    handles: Vec<JoinHandle<()>>,
}

impl TriggerHandles {
    /// No trigger tasks (command short-circuit path).
    pub fn none() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    /// Spawn one supervised task per applicable trigger extension.
    pub fn spawn_all(
        triggers: &[Arc<dyn ConversationalTrigger>],
        platform: &Platform,
        message: &str,
        room_id: &str,
        sender: &str,
    ) -> Self {
        let mut handles = Vec::new();
        for ext in triggers {
            if !ext.platform_supported(platform) {
                continue;
            }
            let ext = Arc::clone(ext);
            let message = message.to_string();
            let room_id = room_id.to_string();
            let sender = sender.to_string();
            handles.push(tokio::spawn(async move {
                if let Err(e) = ext
                    .process(&message, Role::Assistant, &room_id, &sender)
                    .await
                {
                    warn!(extension = ext.name(), error = %e, "trigger processing failed");
                }
            }));
        }
        Self { handles }
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Let the tasks run to completion on their own.
    pub fn detach(self) {
        drop(self.handles);
    }

    /// Wait up to `grace` for all trigger tasks, logging panics.
    ///
    /// Tasks still running when the grace period lapses are left to finish
    /// in the background.
    pub async fn join_with_grace(self, grace: Duration) {
        let joined = futures_util::future::join_all(self.handles);
        match tokio::time::timeout(grace, joined).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        warn!(error = %e, "trigger task panicked");
                    }
                }
            }
            Err(_) => warn!(grace_ms = grace.as_millis() as u64, "trigger grace period lapsed"),
        }
    }
}
