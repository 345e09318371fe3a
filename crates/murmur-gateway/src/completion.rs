use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use murmur_core::config::CompletionConfig;
use murmur_core::ChatMessage;
use murmur_pipeline::{Completion, CompletionError, CompletionGateway};

/// OpenAI-compatible chat-completions client.
///
/// Any transport failure, non-2xx status, or malformed body is a gateway
/// failure — the pipeline turns those into its "Error" reply, so nothing
/// here ever reaches the user directly.
pub struct HttpCompletionGateway {
    client: reqwest::Client,
    config: CompletionConfig,
}

impl HttpCompletionGateway {
    pub fn new(config: CompletionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl CompletionGateway for HttpCompletionGateway {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn complete(&self, context: &[ChatMessage]) -> Result<Completion, CompletionError> {
        let messages: Vec<serde_json::Value> = context
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": m.role.to_string(),
                    "content": m.content,
                })
            })
            .collect();

        let body = serde_json::json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": messages,
        });
        let url = format!("{}/v1/chat/completions", self.config.base_url);

        debug!(model = %self.config.model, messages = context.len(), "requesting completion");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Http(e.to_string()))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "completion API error");
            return Err(CompletionError::Api {
                status,
                message: text,
            });
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;

        let content = api_resp
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CompletionError::Parse("response carried no choices".to_string()))?;

        Ok(Completion { content })
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}
