use std::sync::Arc;

use tracing::{debug, info, warn};

use murmur_core::config::{PipelineConfig, RagCachePolicy};
use murmur_core::{ChatMessage, Platform};
use murmur_extensions::{
    CommandProcessor, ContextProvider, ConversationalTrigger, Extension, ExtensionRegistry, Reply,
    ResponsePreprocessor, RetrievalAugmenter,
};
use murmur_threads::ThreadStore;

use crate::completion::CompletionGateway;
use crate::dispatch::TriggerHandles;
use crate::envelope::augment_user_message;
use crate::error::Result;
use crate::rooms::RoomGate;

/// Reply text substituted when the completion gateway fails.
const GATEWAY_FAILURE_REPLY: &str = "Error";

/// What one turn produced.
///
/// `text` is the reply for the transport to render; the empty string is an
/// explicit no-reply (the turn is persisted, nothing is sent).
/// `side_effects` carries structured extra parts for transports that can
/// render multi-part replies. `triggers` holds the turn's fire-and-forget
/// trigger tasks — callers `detach()` them (the normal case) or wait a
/// bounded grace period on shutdown.
pub struct TurnOutcome {
    pub text: String,
    pub side_effects: Vec<Reply>,
    pub triggers: TriggerHandles,
}

/// The stage pipeline turning an inbound message into a reply.
///
/// Owns its collaborators explicitly: the frozen extension registry, the
/// thread store, the completion gateway, and the per-room turn gate. One
/// instance is shared by every transport adapter.
pub struct Orchestrator {
    registry: Arc<ExtensionRegistry>,
    threads: Arc<ThreadStore>,
    gateway: Arc<dyn CompletionGateway>,
    rooms: RoomGate,
    rag_cache: RagCachePolicy,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<ExtensionRegistry>,
        threads: Arc<ThreadStore>,
        gateway: Arc<dyn CompletionGateway>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            registry,
            threads,
            gateway,
            rooms: RoomGate::new(config.serialize_rooms),
            rag_cache: config.rag_cache,
        }
    }

    /// Run the full turn pipeline for one inbound text message.
    ///
    /// Stage order is strict; see each block. An error from any extension
    /// fails the turn — only completion-gateway failure has a built-in
    /// fallback.
    pub async fn handle_message(
        &self,
        platform: &Platform,
        room_id: &str,
        sender: &str,
        message: &str,
        message_context: Option<Vec<ChatMessage>>,
    ) -> Result<TurnOutcome> {
        // Whole-turn room lock: turns for the same room never interleave.
        let _turn_guard = self.rooms.acquire(room_id).await;

        let mut side_effects: Vec<Reply> = Vec::new();

        // Command interception. A matched command ends the turn here.
        let trimmed = message.trim();
        let mut command_matched = false;
        let mut command_text: Vec<String> = Vec::new();
        for cp in self.registry.command_processors() {
            if !cp.platform_supported(platform) {
                continue;
            }
            if !cp.commands().iter().any(|c| c == trimmed) {
                continue;
            }
            command_matched = true;
            debug!(command = trimmed, processor = cp.name(), "command intercepted");
            if let Some(replies) = cp.process(message, room_id, sender).await? {
                for reply in replies {
                    if reply.is_text() {
                        command_text.push(reply.content);
                    } else {
                        side_effects.push(reply);
                    }
                }
            }
        }
        if command_matched {
            return Ok(TurnOutcome {
                text: command_text.join("\n"),
                side_effects,
                triggers: TriggerHandles::none(),
            });
        }

        // Context assembly: system primer from context providers, then from
        // trigger extensions describing themselves to the model.
        let mut primer: Vec<ChatMessage> = Vec::new();
        for ctx in self.registry.context_providers() {
            if !ctx.platform_supported(platform) {
                continue;
            }
            primer.extend(ctx.get_context(sender));
        }
        for ct in self.registry.triggers() {
            if !ct.platform_supported(platform) {
                continue;
            }
            primer.extend(ct.get_context(sender));
        }

        // History load (lazy create) and user-turn append.
        let mut thread = self.threads.load(room_id)?;
        thread.push_user(message);

        // Retrieval augmentation. Fragments feed the completion envelope;
        // side effects go back to the transport.
        let mut fragments: Vec<ChatMessage> = message_context.unwrap_or_default();
        for aug in self.registry.augmenters() {
            if !aug.platform_supported(platform) {
                continue;
            }
            let retrieval = aug.retrieve(sender, message, &thread).await?;
            debug!(
                augmenter = aug.name(),
                fragments = retrieval.fragments.len(),
                "retrieval complete"
            );
            fragments.extend(retrieval.fragments);
            side_effects.extend(retrieval.side_effects);
        }

        // Build the completion request: primer + history. The envelope
        // rewrite touches only this in-memory copy, never the thread.
        let mut context: Vec<ChatMessage> = primer;
        context.extend(thread.messages.iter().cloned());
        if !fragments.is_empty() {
            if let Some(last) = context.last_mut() {
                last.content = augment_user_message(&fragments, &last.content);
            }
        }

        // Completion. Failure is surfaced to the user as text, never raised.
        debug!(room_id, context_len = context.len(), "requesting completion");
        let content = match self.gateway.complete(&context).await {
            Ok(completion) => completion.content,
            Err(e) => {
                warn!(gateway = self.gateway.name(), error = %e, "completion failed");
                GATEWAY_FAILURE_REPLY.to_string()
            }
        };

        // Persist the true exchange before post-processing can misbehave.
        thread.push_assistant(&content);
        self.threads.save(room_id, &mut thread)?;

        // Retrieval caches: purge after use unless configured to retain.
        if self.rag_cache == RagCachePolicy::ClearAfterUse {
            for aug in self.registry.augmenters() {
                if !aug.platform_supported(platform) {
                    continue;
                }
                if self.threads.keyval().has_key(aug.cache_key())? {
                    self.threads.keyval().remove(aug.cache_key())?;
                    debug!(augmenter = aug.name(), "retrieval cache cleared");
                }
            }
        }

        // Response preprocessing: each extension reads the previous output
        // from the persisted thread and returns the text to feed forward.
        let mut text = content;
        for rpp in self.registry.preprocessors() {
            if !rpp.platform_supported(platform) {
                continue;
            }
            text = rpp.preprocess(room_id, sender).await?;
        }

        // Trigger dispatch: fire-and-forget, supervised.
        let triggers =
            TriggerHandles::spawn_all(self.registry.triggers(), platform, &text, room_id, sender);

        info!(
            room_id,
            platform = %platform,
            reply_len = text.len(),
            side_effects = side_effects.len(),
            "turn complete"
        );

        Ok(TurnOutcome {
            text,
            side_effects,
            triggers,
        })
    }
}
