use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use murmur_core::{Platform, Result};
use murmur_extensions::{CommandProcessor, Extension, Reply};
use murmur_threads::ThreadStore;

/// `//clear.` — empty the room's thread and purge retrieval caches.
///
/// The cache keys are handed in at construction, collected from the
/// augmenters enabled in the same startup enumeration.
pub struct ThreadResetCommand {
    commands: Vec<String>,
    threads: Arc<ThreadStore>,
    cache_keys: Vec<String>,
}

impl ThreadResetCommand {
    pub fn new(threads: Arc<ThreadStore>, cache_keys: Vec<String>) -> Self {
        Self {
            commands: vec!["//clear.".to_string()],
            threads,
            cache_keys,
        }
    }
}

impl Extension for ThreadResetCommand {
    fn name(&self) -> &str {
        "thread_reset"
    }

    fn platforms(&self) -> &[Platform] {
        &[]
    }
}

#[async_trait]
impl CommandProcessor for ThreadResetCommand {
    fn commands(&self) -> &[String] {
        &self.commands
    }

    async fn process(
        &self,
        _message: &str,
        room_id: &str,
        _user_id: &str,
    ) -> Result<Option<Vec<Reply>>> {
        self.threads
            .clear(room_id, 0)
            .map_err(|e| murmur_core::MurmurError::Storage(e.to_string()))?;

        for key in &self.cache_keys {
            let kv = self.threads.keyval();
            if kv
                .has_key(key)
                .map_err(|e| murmur_core::MurmurError::Storage(e.to_string()))?
            {
                kv.remove(key)
                    .map_err(|e| murmur_core::MurmurError::Storage(e.to_string()))?;
                debug!(key, "retrieval cache purged");
            }
        }

        Ok(Some(vec![Reply::text("PUC executed.")]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_threads::{keyval, KeyValStore, SqliteKeyValStore};

    fn kv() -> Arc<dyn KeyValStore> {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        keyval::init_db(&conn).unwrap();
        Arc::new(SqliteKeyValStore::new(conn))
    }

    #[tokio::test]
    async fn clears_thread_and_caches() {
        let kv = kv();
        let threads = Arc::new(ThreadStore::new(kv.clone()));
        let mut thread = threads.load("r1").unwrap();
        thread.push_user("hello");
        thread.push_assistant("hi");
        threads.save("r1", &mut thread).unwrap();
        kv.put("rag_cache:test", b"stale").unwrap();

        let cmd = ThreadResetCommand::new(threads.clone(), vec!["rag_cache:test".into()]);
        let replies = cmd.process("//clear.", "r1", "@u:host").await.unwrap().unwrap();

        assert_eq!(replies, vec![Reply::text("PUC executed.")]);
        assert!(threads.load("r1").unwrap().messages.is_empty());
        assert!(!kv.has_key("rag_cache:test").unwrap());
    }
}
