use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use sl_inference::script::{ScriptDraft, ScriptGenerator, ScriptRequest};
use std::sync::Arc;

use super::non_empty;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub async fn get_settings(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    Ok(Json(state.settings.load().await?))
}

pub async fn save_settings(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<Value>,
) -> ApiResult<Json<Value>> {
    state.settings.save(&settings).await?;
    Ok(Json(json!({ "status": "success" })))
}

#[derive(Debug, Deserialize)]
pub struct ScriptBody {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub age_range: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
}

pub async fn generate_script(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ScriptBody>,
) -> ApiResult<Json<ScriptDraft>> {
    let model = non_empty(body.model)
        .or_else(|| state.default_model.clone())
        .ok_or_else(|| ApiError::bad_request("model name is required"))?;
    let client = state.clients.client_for(body.api_key.as_deref())?;
    let request = ScriptRequest {
        theme: body.theme,
        age_range: non_empty(body.age_range),
        style: non_empty(body.style),
        pages: body.pages,
        model,
        max_tokens: body.max_tokens.unwrap_or(4096),
        temperature: body.temperature.unwrap_or(0.7),
        top_p: body.top_p.unwrap_or(0.7),
    };
    Ok(Json(ScriptGenerator::new(client).generate(&request).await?))
}
