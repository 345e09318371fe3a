use std::time::Instant;

use async_trait::async_trait;

use murmur_core::{Platform, Result};
use murmur_extensions::{CommandPayload, CommandReply, Extension, IpcCommand};

/// `status` — liveness and uptime over the command bus.
pub struct StatusIpc {
    commands: Vec<String>,
    started: Instant,
}

impl StatusIpc {
    pub fn new() -> Self {
        Self {
            commands: vec!["status".to_string()],
            started: Instant::now(),
        }
    }
}

impl Default for StatusIpc {
    fn default() -> Self {
        Self::new()
    }
}

impl Extension for StatusIpc {
    fn name(&self) -> &str {
        "status_ipc"
    }

    fn platforms(&self) -> &[Platform] {
        &[]
    }
}

#[async_trait]
impl IpcCommand for StatusIpc {
    fn ipc_commands(&self) -> &[String] {
        &self.commands
    }

    async fn handle(&self, payload: &CommandPayload) -> Result<()> {
        let _ = payload.reply.resolve(CommandReply::ok(serde_json::json!({
            "status": "running",
            "uptime_secs": self.started.elapsed().as_secs(),
            "version": env!("CARGO_PKG_VERSION"),
        })));
        Ok(())
    }
}
