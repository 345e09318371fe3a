use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a transport surface ("matrix", "text", "webhook", …).
///
/// Extensions declare the platforms they apply to; an empty declaration
/// means the extension applies everywhere. Comparison is exact — platform
/// names are lowercase by convention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform(pub String);

impl Platform {
    /// The chat-protocol client surface.
    pub const MATRIX: &'static str = "matrix";
    /// The interactive text server surface.
    pub const TEXT: &'static str = "text";
    /// The webhook receiver surface.
    pub const WEBHOOK: &'static str = "webhook";

    pub fn matrix() -> Self {
        Self(Self::MATRIX.to_string())
    }

    pub fn text() -> Self {
        Self(Self::TEXT.to_string())
    }

    pub fn webhook() -> Self {
        Self(Self::WEBHOOK.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Platform {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Platform {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Speaker role on a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

/// One entry of a conversation, as stored in a thread and as sent to the
/// completion gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}
