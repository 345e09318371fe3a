use serde::{Deserialize, Serialize};

/// One renderable part of a multi-part reply.
///
/// Transports that can only show text render `content` for `kind == "text"`
/// entries and skip the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            content: content.into(),
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == "text"
    }
}
