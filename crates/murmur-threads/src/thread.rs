use serde::{Deserialize, Serialize};
use serde_json::Value;

use murmur_core::ChatMessage;

use crate::error::{Result, StorageError};

/// Current on-disk thread schema version.
pub const CHAT_THREAD_VERSION: u32 = 1;

/// A persisted per-room conversation.
///
/// `messages` is append-only within a turn — only an explicit clear
/// truncates it — and ordering is chronological, never rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatThread {
    pub schema_version: u32,
    /// RFC3339 creation timestamp.
    pub created_at: String,
    /// RFC3339 timestamp of the last save, stamped by the store.
    pub last_saved_at: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatThread {
    /// A fresh, empty thread at the current schema version.
    pub fn new() -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            schema_version: CHAT_THREAD_VERSION,
            created_at: now.clone(),
            last_saved_at: now,
            messages: Vec::new(),
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }
}

impl Default for ChatThread {
    fn default() -> Self {
        Self::new()
    }
}

/// Upgrade a stored thread blob to the current schema version.
///
/// Version handling is keyed on the stored `schema_version` tag:
/// - missing tag: legacy blob from before versioning — tagged as version 1,
///   with `created_at`/`last_saved_at` backfilled when absent (older blobs
///   used a bare `created` epoch field).
/// - version 1: parsed as-is.
/// - anything newer than this build: refused, never silently reinterpreted.
pub fn migrate(key: &str, mut value: Value) -> Result<ChatThread> {
    let version = value.get("schema_version").and_then(Value::as_u64);

    match version {
        None => {
            let obj = value
                .as_object_mut()
                .ok_or_else(|| StorageError::UnsupportedVersion {
                    key: key.to_string(),
                    version: 0,
                })?;
            obj.insert("schema_version".into(), Value::from(CHAT_THREAD_VERSION));
            let now = chrono::Utc::now().to_rfc3339();
            if !obj.contains_key("created_at") {
                obj.insert("created_at".into(), Value::from(now.clone()));
            }
            if !obj.contains_key("last_saved_at") {
                obj.insert("last_saved_at".into(), Value::from(now));
            }
            obj.remove("created");
            obj.remove("last_saved");
            tracing::debug!(key, "migrated legacy thread to version 1");
            Ok(serde_json::from_value(value)?)
        }
        Some(v) if v == u64::from(CHAT_THREAD_VERSION) => Ok(serde_json::from_value(value)?),
        Some(v) => Err(StorageError::UnsupportedVersion {
            key: key.to_string(),
            version: v as u32,
        }),
    }
}
