use axum::{
    extract::{Multipart, Path, Query, State},
    response::Response,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sl_core::{StoryFilter, StoryPatch, StoryRecord, StoryStorage};
use sl_import::{import_csv, stories_to_csv};
use std::sync::Arc;
use tracing::info;

use super::{csv_attachment, non_empty};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StoriesQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub batch: Option<String>,
}

impl StoriesQuery {
    fn into_filter(self) -> StoryFilter {
        StoryFilter {
            category: non_empty(self.category),
            batch: non_empty(self.batch),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IdsBody {
    #[serde(default)]
    pub ids: Vec<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub batch: Option<String>,
}

pub async fn list_stories(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StoriesQuery>,
) -> ApiResult<Json<Vec<StoryRecord>>> {
    Ok(Json(state.storage.list_stories(&query.into_filter()).await?))
}

pub async fn update_story(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(patch): Json<StoryPatch>,
) -> ApiResult<Json<Value>> {
    let story = state
        .storage
        .update_story(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Story not found"))?;
    Ok(Json(json!({ "message": "Story updated", "story": story })))
}

pub async fn delete_story(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    if !state.storage.delete_story(id).await? {
        return Err(ApiError::not_found("Story not found"));
    }
    Ok(Json(json!({ "message": "Story deleted" })))
}

pub async fn batch_delete(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IdsBody>,
) -> ApiResult<Json<Value>> {
    if body.ids.is_empty() {
        return Err(ApiError::bad_request("ids must not be empty"));
    }
    let deleted = state.storage.delete_stories(&body.ids).await?;
    info!("🗑️ Deleted {} stories", deleted);
    Ok(Json(json!({ "message": format!("Deleted {} stories", deleted), "deleted": deleted })))
}

pub async fn batch_export(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IdsBody>,
) -> ApiResult<Response> {
    if body.ids.is_empty() {
        return Err(ApiError::bad_request("ids must not be empty"));
    }
    let stories = state.storage.get_stories(&body.ids).await?;
    Ok(csv_attachment(stories_to_csv(&stories)?, "stories.csv"))
}

pub async fn export_stories(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StoriesQuery>,
) -> ApiResult<Response> {
    let filter = query.into_filter();
    let filename = match filter.batch.as_deref() {
        Some(batch) => format!("stories_{}.csv", batch),
        None => "stories.csv".to_string(),
    };
    let stories = state.storage.list_stories(&filter).await?;
    info!("📤 Exporting {} stories", stories.len());
    Ok(csv_attachment(stories_to_csv(&stories)?, &filename))
}

pub async fn upload_csv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let batch = non_empty(query.batch);
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        if file_name.is_empty() {
            return Err(ApiError::bad_request("No file selected"));
        }
        if !file_name.to_lowercase().ends_with(".csv") {
            return Err(ApiError::bad_request("Only CSV files are supported"));
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;

        info!("📥 Importing {} ({} bytes)", file_name, data.len());
        let summary = import_csv(state.storage.as_ref(), &data, batch.as_deref()).await?;
        return Ok(Json(json!({
            "message": "Upload complete",
            "success_count": summary.success_count,
            "duplicate_count": summary.duplicate_count,
        })));
    }
    Err(ApiError::bad_request("No file uploaded"))
}
