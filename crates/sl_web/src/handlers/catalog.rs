use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sl_core::categories::{merge_duplicate_categories, MergeReport};
use sl_core::{CatalogStorage, Category, NewPrompt, Prompt, StoryStorage, Style};
use std::sync::Arc;
use tracing::info;

use super::non_empty;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CategoryBody {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MergeQuery {
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct PromptQuery {
    #[serde(default)]
    pub kind: Option<String>,
}

fn category_name(body: &CategoryBody) -> ApiResult<String> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("category name must not be empty"));
    }
    Ok(name.to_string())
}

pub async fn list_categories(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.storage.list_categories().await?))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CategoryBody>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let name = category_name(&body)?;
    let category = state.storage.insert_category(&name, body.parent_id).await?;
    info!("🏷️ Created category {}", category.name);
    Ok((StatusCode::CREATED, Json(category)))
}

/// Renaming also moves the category's stories to the new name.
pub async fn rename_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<CategoryBody>,
) -> ApiResult<Json<Value>> {
    let name = category_name(&body)?;
    let previous = state
        .storage
        .list_categories()
        .await?
        .into_iter()
        .find(|c| c.id == id)
        .ok_or_else(|| ApiError::not_found("Category not found"))?;
    let category = state
        .storage
        .rename_category(id, &name)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;
    let moved = if previous.name == category.name {
        0
    } else {
        state.storage.reassign_category(&previous.name, &category.name).await?
    };
    Ok(Json(json!({ "category": category, "moved": moved })))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    if !state.storage.delete_category(id).await? {
        return Err(ApiError::not_found("Category not found"));
    }
    Ok(Json(json!({ "message": "Category deleted" })))
}

pub async fn merge_categories(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MergeQuery>,
) -> ApiResult<Json<MergeReport>> {
    Ok(Json(merge_duplicate_categories(state.storage.as_ref(), query.dry_run).await?))
}

pub async fn list_styles(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Style>>> {
    Ok(Json(state.storage.list_styles().await?))
}

pub async fn get_style(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Style>> {
    state
        .storage
        .get_style(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Style not found"))
}

pub async fn list_prompts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PromptQuery>,
) -> ApiResult<Json<Vec<Prompt>>> {
    let kind = non_empty(query.kind);
    Ok(Json(state.storage.list_prompts(kind.as_deref()).await?))
}

pub async fn create_prompt(
    State(state): State<Arc<AppState>>,
    Json(prompt): Json<NewPrompt>,
) -> ApiResult<(StatusCode, Json<Prompt>)> {
    Ok((StatusCode::CREATED, Json(state.storage.insert_prompt(prompt).await?)))
}

pub async fn update_prompt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(prompt): Json<NewPrompt>,
) -> ApiResult<Json<Prompt>> {
    state
        .storage
        .update_prompt(id, prompt)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Prompt not found"))
}

pub async fn delete_prompt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    if !state.storage.delete_prompt(id).await? {
        return Err(ApiError::not_found("Prompt not found"));
    }
    Ok(Json(json!({ "message": "Prompt deleted" })))
}
