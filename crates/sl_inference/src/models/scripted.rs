use async_trait::async_trait;
use serde_json::{json, Value};
use sl_core::{CompletionClient, CompletionRequest, Error, Result};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

/// Replays canned completions in order and records every request it receives.
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl fmt::Debug for ScriptedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedClient").finish()
    }
}

impl ScriptedClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_results(replies.into_iter().map(|r| Ok(r.into())))
    }

    pub fn with_results(replies: impl IntoIterator<Item = Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let next = self.replies.lock().ok().and_then(|mut replies| replies.pop_front());
        next.unwrap_or_else(|| Err(Error::External(anyhow::anyhow!("scripted client has no replies left"))))
    }

    async fn list_models(&self) -> Result<Value> {
        Ok(json!({"object": "list", "data": [{"id": "scripted", "object": "model"}]}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sl_core::ChatMessage;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "test-model".to_string(),
            messages: vec![ChatMessage::user("hi")],
            max_tokens: 16,
            temperature: 0.7,
            top_p: 0.7,
        }
    }

    #[tokio::test]
    async fn test_replays_in_order_then_fails() {
        let client = ScriptedClient::new(["first", "second"]);
        assert_eq!(client.complete(&request()).await.unwrap(), "first");
        assert_eq!(client.complete(&request()).await.unwrap(), "second");
        assert!(client.complete(&request()).await.is_err());
        assert_eq!(client.calls(), 3);
        assert_eq!(client.requests()[0].model, "test-model");
    }
}
