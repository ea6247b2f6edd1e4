use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// One chat-completion call, in the wire shape of the completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

#[async_trait]
pub trait CompletionClient: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Perform one round-trip and return the first choice's message text
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Raw model listing from the provider
    async fn list_models(&self) -> Result<serde_json::Value>;
}
