use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::keyval::KeyValStore;
use crate::thread::{migrate, ChatThread};

/// Load/save of versioned conversation history, keyed by room id.
///
/// The store never caches: every load re-reads the key-value collaborator,
/// every save writes through. Concurrent writers to the same room are the
/// caller's problem (the pipeline's room gate serializes them).
pub struct ThreadStore {
    kv: Arc<dyn KeyValStore>,
}

impl ThreadStore {
    pub fn new(kv: Arc<dyn KeyValStore>) -> Self {
        Self { kv }
    }

    fn key(room_id: &str) -> String {
        format!("chat_history:{room_id}")
    }

    /// Fetch the thread for a room, creating a fresh one if none exists.
    ///
    /// Stored blobs missing a `schema_version` tag are migrated in place —
    /// the upgraded form is written back immediately so the migration runs
    /// at most once per thread.
    pub fn load(&self, room_id: &str) -> Result<ChatThread> {
        let key = Self::key(room_id);
        let Some(raw) = self.kv.get(&key)? else {
            debug!(room_id, "no stored thread, starting fresh");
            return Ok(ChatThread::new());
        };

        let value: serde_json::Value = serde_json::from_slice(&raw)?;
        let untagged = value.get("schema_version").is_none();
        let thread = migrate(&key, value)?;
        if untagged {
            self.kv.put(&key, &serde_json::to_vec(&thread)?)?;
        }
        Ok(thread)
    }

    /// Stamp `last_saved_at` and persist the thread.
    pub fn save(&self, room_id: &str, thread: &mut ChatThread) -> Result<()> {
        thread.last_saved_at = chrono::Utc::now().to_rfc3339();
        self.kv
            .put(&Self::key(room_id), &serde_json::to_vec(thread)?)?;
        Ok(())
    }

    /// Truncate the room's thread to its last `keep` messages and persist.
    ///
    /// `keep = 0` empties the thread.
    pub fn clear(&self, room_id: &str, keep: usize) -> Result<()> {
        let mut thread = self.load(room_id)?;
        let len = thread.messages.len();
        if keep < len {
            thread.messages.drain(..len - keep);
        }
        debug!(room_id, keep, "thread cleared");
        self.save(room_id, &mut thread)
    }

    /// Direct access to the underlying key-value collaborator, for callers
    /// that share it (retrieval caches, the user directory).
    pub fn keyval(&self) -> &Arc<dyn KeyValStore> {
        &self.kv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyval::memory_store;
    use murmur_core::ChatMessage;

    fn store() -> ThreadStore {
        ThreadStore::new(Arc::new(memory_store()))
    }

    #[test]
    fn load_missing_room_returns_fresh_thread() {
        let s = store();
        let t = s.load("r1").unwrap();
        assert_eq!(t.schema_version, crate::thread::CHAT_THREAD_VERSION);
        assert!(t.messages.is_empty());
    }

    #[test]
    fn save_then_load_round_trips_messages_in_order() {
        let s = store();
        let mut t = s.load("r1").unwrap();
        t.push_user("one");
        t.push_assistant("two");
        t.push_user("three");
        s.save("r1", &mut t).unwrap();

        let loaded = s.load("r1").unwrap();
        assert_eq!(loaded.messages, t.messages);
        assert_eq!(loaded.messages[2], ChatMessage::user("three"));
    }

    #[test]
    fn save_stamps_last_saved_at() {
        let s = store();
        let mut t = ChatThread::new();
        let before = t.last_saved_at.clone();
        std::thread::sleep(std::time::Duration::from_millis(5));
        s.save("r1", &mut t).unwrap();
        assert!(t.last_saved_at > before);
    }

    #[test]
    fn clear_keep_zero_empties_thread() {
        let s = store();
        let mut t = s.load("r1").unwrap();
        t.push_user("a");
        t.push_assistant("b");
        s.save("r1", &mut t).unwrap();

        s.clear("r1", 0).unwrap();
        assert!(s.load("r1").unwrap().messages.is_empty());
    }

    #[test]
    fn clear_keeps_last_n_messages() {
        let s = store();
        let mut t = s.load("r1").unwrap();
        t.push_user("a");
        t.push_assistant("b");
        t.push_user("c");
        t.push_assistant("d");
        s.save("r1", &mut t).unwrap();

        s.clear("r1", 2).unwrap();
        let loaded = s.load("r1").unwrap();
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(loaded.messages[0].content, "c");
        assert_eq!(loaded.messages[1].content, "d");
    }

    #[test]
    fn legacy_blob_is_rewritten_versioned_on_load() {
        let kv = Arc::new(memory_store());
        let legacy = serde_json::json!({
            "messages": [{"role": "user", "content": "old"}]
        });
        kv.put("chat_history:r1", &serde_json::to_vec(&legacy).unwrap())
            .unwrap();

        let s = ThreadStore::new(kv.clone());
        let t = s.load("r1").unwrap();
        assert_eq!(t.schema_version, crate::thread::CHAT_THREAD_VERSION);
        assert_eq!(t.messages.len(), 1);

        // the stored blob now carries the version tag
        let raw = kv.get("chat_history:r1").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["schema_version"], 1);
    }
}
