use murmur_core::{ChatMessage, Platform};
use murmur_extensions::{ContextProvider, Extension};

/// Injects the configured assistant persona, when one is set.
pub struct PersonaContext {
    persona: Option<String>,
}

impl PersonaContext {
    pub fn new(persona: Option<String>) -> Self {
        Self { persona }
    }
}

impl Extension for PersonaContext {
    fn name(&self) -> &str {
        "persona_context"
    }

    fn platforms(&self) -> &[Platform] {
        &[]
    }
}

impl ContextProvider for PersonaContext {
    fn get_context(&self, _user_id: &str) -> Vec<ChatMessage> {
        match &self.persona {
            Some(persona) => vec![ChatMessage::system(persona.clone())],
            None => vec![],
        }
    }
}
