use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use murmur_core::{ChatMessage, Platform, Result, Role};
use murmur_extensions::{ConversationalTrigger, Extension};
use murmur_threads::KeyValStore;

const PROBE_LOG_KEY: &str = "echo_probe:last";

/// Minimal conversational trigger: records assistant replies that carry the
/// probe word. Mostly exercised by deployments verifying trigger plumbing.
pub struct EchoProbeTrigger {
    triggers: Vec<String>,
    kv: Arc<dyn KeyValStore>,
}

impl EchoProbeTrigger {
    pub fn new(kv: Arc<dyn KeyValStore>) -> Self {
        Self {
            triggers: vec!["[probe]".to_string()],
            kv,
        }
    }
}

impl Extension for EchoProbeTrigger {
    fn name(&self) -> &str {
        "echo_probe"
    }

    fn platforms(&self) -> &[Platform] {
        &[]
    }
}

#[async_trait]
impl ConversationalTrigger for EchoProbeTrigger {
    fn triggers(&self) -> &[String] {
        &self.triggers
    }

    fn get_context(&self, _user_id: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::system(
            "To confirm trigger plumbing is working when asked, include the \
             literal word [probe] in your reply.",
        )]
    }

    async fn process(&self, message: &str, role: Role, room_id: &str, _user_id: &str) -> Result<()> {
        if role != Role::Assistant {
            return Ok(());
        }
        if !self.triggers.iter().any(|t| message.contains(t)) {
            return Ok(());
        }
        info!(room_id, "probe trigger fired");
        self.kv
            .put(PROBE_LOG_KEY, message.as_bytes())
            .map_err(|e| murmur_core::MurmurError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_threads::{keyval, SqliteKeyValStore};

    fn kv() -> Arc<dyn KeyValStore> {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        keyval::init_db(&conn).unwrap();
        Arc::new(SqliteKeyValStore::new(conn))
    }

    #[tokio::test]
    async fn records_probe_replies_only() {
        let kv = kv();
        let trigger = EchoProbeTrigger::new(kv.clone());

        trigger
            .process("no probe here", Role::Assistant, "r1", "@u")
            .await
            .unwrap();
        assert!(!kv.has_key(PROBE_LOG_KEY).unwrap());

        trigger
            .process("confirmed [probe]", Role::Assistant, "r1", "@u")
            .await
            .unwrap();
        assert_eq!(
            kv.get(PROBE_LOG_KEY).unwrap().as_deref(),
            Some("confirmed [probe]".as_bytes())
        );
    }

    #[tokio::test]
    async fn ignores_user_turns() {
        let kv = kv();
        let trigger = EchoProbeTrigger::new(kv.clone());
        trigger
            .process("[probe]", Role::User, "r1", "@u")
            .await
            .unwrap();
        assert!(!kv.has_key(PROBE_LOG_KEY).unwrap());
    }
}
