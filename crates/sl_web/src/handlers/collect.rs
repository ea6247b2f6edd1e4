use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use sl_core::ChatMessage;
use sl_inference::collector::{
    first_user_instruction, CollectRequest, CollectionOutcome, CollectionStop, StoryCollector,
};
use std::sync::Arc;
use tracing::info;

use super::non_empty;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CollectBody {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub test: bool,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub batch: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiKeyBody {
    #[serde(default)]
    pub api_key: Option<String>,
}

fn model_for(state: &AppState, requested: Option<String>) -> ApiResult<String> {
    non_empty(requested)
        .or_else(|| state.default_model.clone())
        .ok_or_else(|| ApiError::bad_request("model name is required"))
}

/// Malformed and empty answers still answer 200; only the body says what went wrong.
fn outcome_body(outcome: CollectionOutcome) -> Value {
    let saved = outcome.saved_titles();
    let (message_key, message, content) = match &outcome.stop {
        CollectionStop::Test { raw } => {
            return json!({ "message": "Test mode", "content": raw });
        }
        CollectionStop::Malformed { raw } => {
            ("error", "Model response is not a valid JSON array".to_string(), Some(raw.clone()))
        }
        CollectionStop::Empty => ("error", "Model returned no stories".to_string(), Some("[]".to_string())),
        CollectionStop::Fulfilled | CollectionStop::AttemptsExhausted if outcome.met => {
            ("message", "Stories collected and saved".to_string(), None)
        }
        CollectionStop::Fulfilled | CollectionStop::AttemptsExhausted => (
            "message",
            format!("Only collected {} of {} stories", outcome.collected.len(), outcome.target_count),
            None,
        ),
    };

    let mut body = json!({
        "category": outcome.category,
        "saved": saved,
        "duplicate": outcome.duplicate_titles,
        "skipped_mismatch": outcome.skipped_mismatch,
        "attempts": outcome.attempts_used,
        "stories": outcome.collected,
    });
    body[message_key] = Value::String(message);
    if let Some(content) = content {
        body["content"] = Value::String(content);
    }
    body
}

pub async fn collect_stories(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CollectBody>,
) -> ApiResult<Json<Value>> {
    info!(
        "📨 Collect request: category {:?}, count {:?}, test {}",
        body.category, body.count, body.test
    );
    if body.messages.is_empty() {
        return Err(ApiError::bad_request("messages must not be empty"));
    }
    let model = model_for(&state, body.model)?;
    let client = state.clients.client_for(body.api_key.as_deref())?;

    let mut request = CollectRequest::new(String::new(), body.count.unwrap_or(1), model);
    request.category = non_empty(body.category);
    request.user_instruction = first_user_instruction(&body.messages);
    request.batch = non_empty(body.batch);
    request.test = body.test;
    if let Some(max_tokens) = body.max_tokens {
        request.max_tokens = max_tokens;
    }
    if let Some(temperature) = body.temperature {
        request.temperature = temperature;
    }
    if let Some(top_p) = body.top_p {
        request.top_p = top_p;
    }

    let collector = StoryCollector::new(client, state.storage.clone(), state.template.clone());
    let outcome = collector.collect(&request).await?;
    Ok(Json(outcome_body(outcome)))
}

pub async fn list_models(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ApiKeyBody>>,
) -> ApiResult<Json<Value>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let client = state.clients.client_for(body.api_key.as_deref())?;
    Ok(Json(client.list_models().await?))
}
