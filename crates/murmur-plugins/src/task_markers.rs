use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use murmur_core::{Platform, Result};
use murmur_extensions::{Extension, ResponsePreprocessor};
use murmur_threads::ThreadStore;

const TASK_MARKER: &str = "[task]";
const END_TASK_MARKER: &str = "[end-task]";

/// Task-boundary bookkeeping on the assistant reply.
///
/// The model flags task starts and ends with inline markers. This
/// preprocessor strips them from the persisted turn and resets the thread at
/// task boundaries:
/// - `[task]`: a new task began — keep only the latest exchange.
/// - `[end-task]`: the task finished — empty the thread, unless the reply
///   carries a trigger word (a trigger extension still needs the history).
///
/// Runs after the turn is persisted, so all mutations are idempotent: a
/// second pass finds no markers and changes nothing.
pub struct TaskMarkerPreprocessor {
    threads: Arc<ThreadStore>,
    /// Trigger words declared by the enabled trigger extensions.
    trigger_words: Vec<String>,
}

impl TaskMarkerPreprocessor {
    pub fn new(threads: Arc<ThreadStore>, trigger_words: Vec<String>) -> Self {
        Self {
            threads,
            trigger_words,
        }
    }
}

impl Extension for TaskMarkerPreprocessor {
    fn name(&self) -> &str {
        "task_markers"
    }

    fn platforms(&self) -> &[Platform] {
        &[]
    }
}

#[async_trait]
impl ResponsePreprocessor for TaskMarkerPreprocessor {
    async fn preprocess(&self, room_id: &str, _user_id: &str) -> Result<String> {
        let mut thread = self
            .threads
            .load(room_id)
            .map_err(|e| murmur_core::MurmurError::Storage(e.to_string()))?;

        let Some(last) = thread.messages.last() else {
            return Ok(String::new());
        };
        let original = last.content.clone();

        let task = original.contains(TASK_MARKER);
        let end_task = original.contains(END_TASK_MARKER);
        let cleaned = original
            .replace(TASK_MARKER, "")
            .replace(END_TASK_MARKER, "")
            .trim()
            .to_string();

        if !(task || end_task) {
            return Ok(cleaned);
        }

        if let Some(last) = thread.messages.last_mut() {
            last.content = cleaned.clone();
        }
        self.threads
            .save(room_id, &mut thread)
            .map_err(|e| murmur_core::MurmurError::Storage(e.to_string()))?;

        if task {
            debug!(room_id, "task marker detected, keeping latest exchange");
            self.threads
                .clear(room_id, 2)
                .map_err(|e| murmur_core::MurmurError::Storage(e.to_string()))?;
        }

        if end_task {
            let triggered = self.trigger_words.iter().any(|t| cleaned.contains(t));
            if triggered {
                debug!(room_id, "end-task marker ignored, trigger word present");
            } else {
                debug!(room_id, "end-task marker detected, emptying thread");
                self.threads
                    .clear(room_id, 0)
                    .map_err(|e| murmur_core::MurmurError::Storage(e.to_string()))?;
            }
        }

        Ok(cleaned)
    }
}
