//! End-to-end turn pipeline behavior with mock collaborators.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use murmur_core::config::{PipelineConfig, RagCachePolicy};
use murmur_core::{ChatMessage, Platform, Role};
use murmur_extensions::{
    CommandProcessor, ConversationalTrigger, Extension, RegistryBuilder, Reply,
    ResponsePreprocessor, Retrieval, RetrievalAugmenter,
};
use murmur_pipeline::{Completion, CompletionError, CompletionGateway, Orchestrator};
use murmur_threads::{keyval, ChatThread, KeyValStore, SqliteKeyValStore, ThreadStore};

// ---------------------------------------------------------------------------
// Mock collaborators
// ---------------------------------------------------------------------------

fn memory_kv() -> Arc<dyn KeyValStore> {
    let conn = rusqlite::Connection::open_in_memory().expect("in-memory sqlite");
    keyval::init_db(&conn).expect("init kv table");
    Arc::new(SqliteKeyValStore::new(conn))
}

struct MockGateway {
    calls: AtomicUsize,
    fail: bool,
    content: String,
    captured: Mutex<Vec<Vec<ChatMessage>>>,
    order: Arc<Mutex<Vec<String>>>,
}

impl MockGateway {
    fn replying(content: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
            content: content.to_string(),
            captured: Mutex::new(Vec::new()),
            order: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
            content: String::new(),
            captured: Mutex::new(Vec::new()),
            order: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn with_order(content: &str, order: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
            content: content.to_string(),
            captured: Mutex::new(Vec::new()),
            order,
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_context(&self) -> Vec<ChatMessage> {
        self.captured.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl CompletionGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, context: &[ChatMessage]) -> Result<Completion, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.order.lock().unwrap().push("gateway".to_string());
        self.captured.lock().unwrap().push(context.to_vec());
        if self.fail {
            return Err(CompletionError::Unavailable("mock outage".into()));
        }
        Ok(Completion {
            content: self.content.clone(),
        })
    }
}

struct StaticCommand {
    commands: Vec<String>,
    reply: String,
}

impl StaticCommand {
    fn new(command: &str, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            commands: vec![command.to_string()],
            reply: reply.to_string(),
        })
    }
}

impl Extension for StaticCommand {
    fn name(&self) -> &str {
        "static-command"
    }
    fn platforms(&self) -> &[Platform] {
        &[]
    }
}

#[async_trait]
impl CommandProcessor for StaticCommand {
    fn commands(&self) -> &[String] {
        &self.commands
    }

    async fn process(
        &self,
        _message: &str,
        _room_id: &str,
        _user_id: &str,
    ) -> murmur_core::Result<Option<Vec<Reply>>> {
        Ok(Some(vec![Reply::text(&self.reply)]))
    }
}

struct OrderedAugmenter {
    label: &'static str,
    cache_key: String,
    fragment: String,
    order: Arc<Mutex<Vec<String>>>,
    kv: Arc<dyn KeyValStore>,
}

impl Extension for OrderedAugmenter {
    fn name(&self) -> &str {
        self.label
    }
    fn platforms(&self) -> &[Platform] {
        &[]
    }
}

#[async_trait]
impl RetrievalAugmenter for OrderedAugmenter {
    fn cache_key(&self) -> &str {
        &self.cache_key
    }

    async fn retrieve(
        &self,
        _sender: &str,
        _message: &str,
        _thread: &ChatThread,
    ) -> murmur_core::Result<Retrieval> {
        self.order.lock().unwrap().push(self.label.to_string());
        self.kv
            .put(&self.cache_key, b"cached-context")
            .map_err(|e| murmur_core::MurmurError::Storage(e.to_string()))?;
        Ok(Retrieval {
            fragments: vec![ChatMessage::system(&self.fragment)],
            side_effects: vec![],
        })
    }
}

/// Strips a marker token from the persisted assistant turn and persists the
/// cleaned thread (idempotent), returning the cleaned text.
struct MarkerStrip {
    marker: &'static str,
    threads: Arc<ThreadStore>,
}

impl Extension for MarkerStrip {
    fn name(&self) -> &str {
        "marker-strip"
    }
    fn platforms(&self) -> &[Platform] {
        &[]
    }
}

#[async_trait]
impl ResponsePreprocessor for MarkerStrip {
    async fn preprocess(&self, room_id: &str, _user_id: &str) -> murmur_core::Result<String> {
        let mut thread = self
            .threads
            .load(room_id)
            .map_err(|e| murmur_core::MurmurError::Storage(e.to_string()))?;
        let Some(last) = thread.messages.last_mut() else {
            return Ok(String::new());
        };
        let cleaned = last.content.replace(self.marker, "").trim().to_string();
        if cleaned != last.content {
            last.content = cleaned.clone();
            self.threads
                .save(room_id, &mut thread)
                .map_err(|e| murmur_core::MurmurError::Storage(e.to_string()))?;
        }
        Ok(cleaned)
    }
}

/// Appends a suffix to whatever the previous stage persisted.
struct SuffixAppend {
    suffix: &'static str,
    threads: Arc<ThreadStore>,
}

impl Extension for SuffixAppend {
    fn name(&self) -> &str {
        "suffix-append"
    }
    fn platforms(&self) -> &[Platform] {
        &[]
    }
}

#[async_trait]
impl ResponsePreprocessor for SuffixAppend {
    async fn preprocess(&self, room_id: &str, _user_id: &str) -> murmur_core::Result<String> {
        let thread = self
            .threads
            .load(room_id)
            .map_err(|e| murmur_core::MurmurError::Storage(e.to_string()))?;
        let last = thread
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(format!("{} {}", last, self.suffix))
    }
}

struct SlowTrigger {
    triggers: Vec<String>,
    fired: Arc<AtomicBool>,
}

impl Extension for SlowTrigger {
    fn name(&self) -> &str {
        "slow-trigger"
    }
    fn platforms(&self) -> &[Platform] {
        &[]
    }
}

#[async_trait]
impl ConversationalTrigger for SlowTrigger {
    fn triggers(&self) -> &[String] {
        &self.triggers
    }
    fn get_context(&self, _user_id: &str) -> Vec<ChatMessage> {
        vec![]
    }
    async fn process(
        &self,
        _message: &str,
        _role: Role,
        _room_id: &str,
        _sender: &str,
    ) -> murmur_core::Result<()> {
        tokio::time::sleep(Duration::from_millis(40)).await;
        self.fired.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn pipeline_config(rag_cache: RagCachePolicy) -> PipelineConfig {
    PipelineConfig {
        rag_cache,
        serialize_rooms: true,
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_message_creates_versioned_thread_with_both_turns() {
    let kv = memory_kv();
    let threads = Arc::new(ThreadStore::new(kv));
    let gateway = MockGateway::replying("hello yourself");
    let orchestrator = Orchestrator::new(
        Arc::new(murmur_extensions::ExtensionRegistry::empty()),
        threads.clone(),
        gateway.clone(),
        &pipeline_config(RagCachePolicy::ClearAfterUse),
    );

    let outcome = orchestrator
        .handle_message(&Platform::text(), "R1", "@u:host", "hello", None)
        .await
        .unwrap();
    outcome.triggers.detach();

    assert_eq!(outcome.text, "hello yourself");

    let thread = threads.load("R1").unwrap();
    assert_eq!(thread.schema_version, murmur_threads::CHAT_THREAD_VERSION);
    assert_eq!(thread.messages.len(), 2);
    assert_eq!(thread.messages[0], ChatMessage::user("hello"));
    assert_eq!(thread.messages[1], ChatMessage::assistant("hello yourself"));
}

#[tokio::test]
async fn matched_command_short_circuits_the_gateway() {
    let threads = Arc::new(ThreadStore::new(memory_kv()));
    let gateway = MockGateway::replying("should never be seen");
    let mut builder = RegistryBuilder::new();
    builder.register_command_processor(StaticCommand::new("//clear.", "history cleared"));
    let orchestrator = Orchestrator::new(
        Arc::new(builder.build()),
        threads,
        gateway.clone(),
        &pipeline_config(RagCachePolicy::ClearAfterUse),
    );

    let outcome = orchestrator
        .handle_message(&Platform::text(), "R1", "@u:host", "  //clear.  ", None)
        .await
        .unwrap();
    outcome.triggers.detach();

    assert_eq!(outcome.text, "history cleared");
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn gateway_failure_persists_the_error_sentinel() {
    let threads = Arc::new(ThreadStore::new(memory_kv()));
    let gateway = MockGateway::failing();
    let orchestrator = Orchestrator::new(
        Arc::new(murmur_extensions::ExtensionRegistry::empty()),
        threads.clone(),
        gateway,
        &pipeline_config(RagCachePolicy::ClearAfterUse),
    );

    let outcome = orchestrator
        .handle_message(&Platform::text(), "R1", "@u:host", "hi", None)
        .await
        .unwrap();
    outcome.triggers.detach();

    assert_eq!(outcome.text, "Error");
    let thread = threads.load("R1").unwrap();
    assert_eq!(thread.messages[1], ChatMessage::assistant("Error"));
}

#[tokio::test]
async fn augmenters_run_in_registration_order_before_the_gateway() {
    let kv = memory_kv();
    let threads = Arc::new(ThreadStore::new(kv.clone()));
    let order = Arc::new(Mutex::new(Vec::new()));
    let gateway = MockGateway::with_order("ok", order.clone());

    let mut builder = RegistryBuilder::new();
    builder
        .register_augmenter(Arc::new(OrderedAugmenter {
            label: "first",
            cache_key: "rag_cache:first".into(),
            fragment: "fragment one".into(),
            order: order.clone(),
            kv: kv.clone(),
        }))
        .register_augmenter(Arc::new(OrderedAugmenter {
            label: "second",
            cache_key: "rag_cache:second".into(),
            fragment: "fragment two".into(),
            order: order.clone(),
            kv: kv.clone(),
        }));

    let orchestrator = Orchestrator::new(
        Arc::new(builder.build()),
        threads,
        gateway.clone(),
        &pipeline_config(RagCachePolicy::Retain),
    );

    let outcome = orchestrator
        .handle_message(&Platform::text(), "R1", "@u:host", "question", None)
        .await
        .unwrap();
    outcome.triggers.detach();

    assert_eq!(
        *order.lock().unwrap(),
        vec!["first".to_string(), "second".to_string(), "gateway".to_string()]
    );
}

#[tokio::test]
async fn envelope_reaches_the_gateway_but_not_the_thread() {
    let kv = memory_kv();
    let threads = Arc::new(ThreadStore::new(kv.clone()));
    let gateway = MockGateway::replying("answer");

    let order = Arc::new(Mutex::new(Vec::new()));
    let mut builder = RegistryBuilder::new();
    builder.register_augmenter(Arc::new(OrderedAugmenter {
        label: "aug",
        cache_key: "rag_cache:aug".into(),
        fragment: "retrieved fact".into(),
        order,
        kv: kv.clone(),
    }));

    let orchestrator = Orchestrator::new(
        Arc::new(builder.build()),
        threads.clone(),
        gateway.clone(),
        &pipeline_config(RagCachePolicy::Retain),
    );

    let caller_context = vec![ChatMessage::system("caption: a photo of a cat")];
    let outcome = orchestrator
        .handle_message(
            &Platform::matrix(),
            "R1",
            "@u:host",
            "what is this?",
            Some(caller_context),
        )
        .await
        .unwrap();
    outcome.triggers.detach();

    // the completion request saw the envelope, caller fragments first
    let sent = gateway.last_context();
    let last = &sent.last().unwrap().content;
    assert!(last.starts_with("[CONTEXT]\n1. caption: a photo of a cat"));
    assert!(last.contains("2. retrieved fact"));
    assert!(last.ends_with("[USER_MESSAGE]\nwhat is this?\n[/USER_MESSAGE]"));

    // the persisted thread kept the original user words
    let thread = threads.load("R1").unwrap();
    assert_eq!(thread.messages[0], ChatMessage::user("what is this?"));
}

#[tokio::test]
async fn rag_cache_cleared_after_use_but_retained_under_retain_policy() {
    for (policy, expect_present) in [
        (RagCachePolicy::ClearAfterUse, false),
        (RagCachePolicy::Retain, true),
    ] {
        let kv = memory_kv();
        let threads = Arc::new(ThreadStore::new(kv.clone()));
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut builder = RegistryBuilder::new();
        builder.register_augmenter(Arc::new(OrderedAugmenter {
            label: "aug",
            cache_key: "rag_cache:aug".into(),
            fragment: "fact".into(),
            order,
            kv: kv.clone(),
        }));
        let orchestrator = Orchestrator::new(
            Arc::new(builder.build()),
            threads,
            MockGateway::replying("ok"),
            &pipeline_config(policy),
        );

        let outcome = orchestrator
            .handle_message(&Platform::text(), "R1", "@u:host", "q", None)
            .await
            .unwrap();
        outcome.triggers.detach();

        assert_eq!(
            kv.has_key("rag_cache:aug").unwrap(),
            expect_present,
            "policy {policy:?}"
        );
    }
}

#[tokio::test]
async fn preprocessor_chain_applies_in_registration_order() {
    let threads = Arc::new(ThreadStore::new(memory_kv()));
    let gateway = MockGateway::replying("[task] do the thing");

    let mut builder = RegistryBuilder::new();
    builder
        .register_preprocessor(Arc::new(MarkerStrip {
            marker: "[task]",
            threads: threads.clone(),
        }))
        .register_preprocessor(Arc::new(SuffixAppend {
            suffix: "(done)",
            threads: threads.clone(),
        }));

    let orchestrator = Orchestrator::new(
        Arc::new(builder.build()),
        threads.clone(),
        gateway,
        &pipeline_config(RagCachePolicy::ClearAfterUse),
    );

    let outcome = orchestrator
        .handle_message(&Platform::text(), "R1", "@u:host", "go", None)
        .await
        .unwrap();
    outcome.triggers.detach();

    assert_eq!(outcome.text, "do the thing (done)");
    // the strip was persisted; the suffix was not
    let thread = threads.load("R1").unwrap();
    assert_eq!(thread.messages[1], ChatMessage::assistant("do the thing"));
}

#[tokio::test]
async fn trigger_dispatch_is_fire_and_forget() {
    let threads = Arc::new(ThreadStore::new(memory_kv()));
    let fired = Arc::new(AtomicBool::new(false));
    let mut builder = RegistryBuilder::new();
    builder.register_trigger(Arc::new(SlowTrigger {
        triggers: vec!["reminder".to_string()],
        fired: fired.clone(),
    }));

    let orchestrator = Orchestrator::new(
        Arc::new(builder.build()),
        threads,
        MockGateway::replying("done"),
        &pipeline_config(RagCachePolicy::ClearAfterUse),
    );

    let outcome = orchestrator
        .handle_message(&Platform::text(), "R1", "@u:host", "hi", None)
        .await
        .unwrap();

    // the orchestrator came back first
    assert!(!fired.load(Ordering::SeqCst));

    outcome
        .triggers
        .join_with_grace(Duration::from_millis(500))
        .await;
    assert!(fired.load(Ordering::SeqCst));
}

#[tokio::test]
async fn same_room_turns_do_not_interleave() {
    let threads = Arc::new(ThreadStore::new(memory_kv()));
    let gateway = MockGateway::replying("reply");
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(murmur_extensions::ExtensionRegistry::empty()),
        threads.clone(),
        gateway,
        &pipeline_config(RagCachePolicy::ClearAfterUse),
    ));

    let mut tasks = Vec::new();
    for i in 0..4 {
        let orchestrator = orchestrator.clone();
        tasks.push(tokio::spawn(async move {
            let outcome = orchestrator
                .handle_message(
                    &Platform::text(),
                    "R1",
                    "@u:host",
                    &format!("msg-{i}"),
                    None,
                )
                .await
                .unwrap();
            outcome.triggers.detach();
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }

    // no lost updates: all four exchanges survived
    let thread = threads.load("R1").unwrap();
    assert_eq!(thread.messages.len(), 8);
}
