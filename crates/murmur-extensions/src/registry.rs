use std::sync::Arc;

use tracing::debug;

use crate::capability::{
    CommandProcessor, ContextProvider, ConversationalTrigger, FrameworkExtension, IpcCommand,
    MessageHandler, ResponsePreprocessor, RetrievalAugmenter,
};

/// Accumulates constructed extension instances during startup.
///
/// Registration order is significant and preserved: the orchestrator invokes
/// same-capability extensions in exactly this order.
#[derive(Default)]
pub struct RegistryBuilder {
    command_processors: Vec<Arc<dyn CommandProcessor>>,
    triggers: Vec<Arc<dyn ConversationalTrigger>>,
    context_providers: Vec<Arc<dyn ContextProvider>>,
    message_handlers: Vec<Arc<dyn MessageHandler>>,
    augmenters: Vec<Arc<dyn RetrievalAugmenter>>,
    preprocessors: Vec<Arc<dyn ResponsePreprocessor>>,
    ipc_commands: Vec<Arc<dyn IpcCommand>>,
    framework: Vec<Arc<dyn FrameworkExtension>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_command_processor(&mut self, ext: Arc<dyn CommandProcessor>) -> &mut Self {
        debug!(name = ext.name(), "registered command processor");
        self.command_processors.push(ext);
        self
    }

    pub fn register_trigger(&mut self, ext: Arc<dyn ConversationalTrigger>) -> &mut Self {
        debug!(name = ext.name(), "registered conversational trigger");
        self.triggers.push(ext);
        self
    }

    pub fn register_context_provider(&mut self, ext: Arc<dyn ContextProvider>) -> &mut Self {
        debug!(name = ext.name(), "registered context provider");
        self.context_providers.push(ext);
        self
    }

    pub fn register_message_handler(&mut self, ext: Arc<dyn MessageHandler>) -> &mut Self {
        debug!(name = ext.name(), "registered message handler");
        self.message_handlers.push(ext);
        self
    }

    pub fn register_augmenter(&mut self, ext: Arc<dyn RetrievalAugmenter>) -> &mut Self {
        debug!(name = ext.name(), "registered retrieval augmenter");
        self.augmenters.push(ext);
        self
    }

    pub fn register_preprocessor(&mut self, ext: Arc<dyn ResponsePreprocessor>) -> &mut Self {
        debug!(name = ext.name(), "registered response preprocessor");
        self.preprocessors.push(ext);
        self
    }

    pub fn register_ipc_command(&mut self, ext: Arc<dyn IpcCommand>) -> &mut Self {
        debug!(name = ext.name(), "registered ipc command handler");
        self.ipc_commands.push(ext);
        self
    }

    pub fn register_framework(&mut self, ext: Arc<dyn FrameworkExtension>) -> &mut Self {
        debug!(name = ext.name(), "registered framework extension");
        self.framework.push(ext);
        self
    }

    /// Freeze into an immutable registry. Startup ends here: there is no
    /// way to add or remove extensions afterwards.
    pub fn build(self) -> ExtensionRegistry {
        ExtensionRegistry {
            command_processors: self.command_processors,
            triggers: self.triggers,
            context_providers: self.context_providers,
            message_handlers: self.message_handlers,
            augmenters: self.augmenters,
            preprocessors: self.preprocessors,
            ipc_commands: self.ipc_commands,
            framework: self.framework,
        }
    }
}

/// Read-only typed containers of constructed extensions, one per capability.
///
/// Safe for concurrent reads without locking — nothing mutates after
/// [`RegistryBuilder::build`].
pub struct ExtensionRegistry {
    command_processors: Vec<Arc<dyn CommandProcessor>>,
    triggers: Vec<Arc<dyn ConversationalTrigger>>,
    context_providers: Vec<Arc<dyn ContextProvider>>,
    message_handlers: Vec<Arc<dyn MessageHandler>>,
    augmenters: Vec<Arc<dyn RetrievalAugmenter>>,
    preprocessors: Vec<Arc<dyn ResponsePreprocessor>>,
    ipc_commands: Vec<Arc<dyn IpcCommand>>,
    framework: Vec<Arc<dyn FrameworkExtension>>,
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("command_processors", &self.command_processors.len())
            .field("triggers", &self.triggers.len())
            .field("context_providers", &self.context_providers.len())
            .field("message_handlers", &self.message_handlers.len())
            .field("augmenters", &self.augmenters.len())
            .field("preprocessors", &self.preprocessors.len())
            .field("ipc_commands", &self.ipc_commands.len())
            .field("framework", &self.framework.len())
            .finish()
    }
}

impl ExtensionRegistry {
    pub fn command_processors(&self) -> &[Arc<dyn CommandProcessor>] {
        &self.command_processors
    }

    pub fn triggers(&self) -> &[Arc<dyn ConversationalTrigger>] {
        &self.triggers
    }

    pub fn context_providers(&self) -> &[Arc<dyn ContextProvider>] {
        &self.context_providers
    }

    pub fn message_handlers(&self) -> &[Arc<dyn MessageHandler>] {
        &self.message_handlers
    }

    pub fn augmenters(&self) -> &[Arc<dyn RetrievalAugmenter>] {
        &self.augmenters
    }

    pub fn preprocessors(&self) -> &[Arc<dyn ResponsePreprocessor>] {
        &self.preprocessors
    }

    pub fn ipc_commands(&self) -> &[Arc<dyn IpcCommand>] {
        &self.ipc_commands
    }

    pub fn framework(&self) -> &[Arc<dyn FrameworkExtension>] {
        &self.framework
    }

    /// An empty registry, mostly useful in tests.
    pub fn empty() -> Self {
        RegistryBuilder::new().build()
    }
}
