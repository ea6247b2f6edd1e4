use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sl_core::{NewProject, Project, ProjectStorage, ProjectSummary};
use std::sync::Arc;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RenameBody {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PagesBody {
    #[serde(default)]
    pub pages: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageHintsBody {
    #[serde(default)]
    pub prompts: Vec<Value>,
}

fn project_not_found() -> ApiError {
    ApiError::not_found("Project not found")
}

pub async fn list_projects(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<ProjectSummary>>> {
    let projects = state.storage.list_projects().await?;
    Ok(Json(projects.iter().map(Project::summary).collect()))
}

pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Json(project): Json<NewProject>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let project = state.storage.insert_project(project).await?;
    info!("📚 Created project {} ({})", project.id, project.title);
    Ok((StatusCode::CREATED, Json(json!({ "id": project.id }))))
}

pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Project>> {
    state.storage.get_project(id).await?.map(Json).ok_or_else(project_not_found)
}

/// Only the title is editable here; a body without one leaves the project as is.
pub async fn rename_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<RenameBody>,
) -> ApiResult<Json<Value>> {
    let found = match body.title {
        Some(title) => state.storage.rename_project(id, &title).await?.is_some(),
        None => state.storage.get_project(id).await?.is_some(),
    };
    if !found {
        return Err(project_not_found());
    }
    Ok(Json(json!({ "msg": "ok" })))
}

pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    if !state.storage.delete_project(id).await? {
        return Err(project_not_found());
    }
    Ok(Json(json!({ "msg": "deleted" })))
}

pub async fn save_script(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<PagesBody>,
) -> ApiResult<Json<Value>> {
    let project = state
        .storage
        .save_pages(id, body.pages)
        .await?
        .ok_or_else(project_not_found)?;
    info!("📝 Saved {} pages for project {}", project.pages.len(), id);
    Ok(Json(json!({ "msg": "saved" })))
}

/// Writes prompt `i` into page `i` as its `image_hint`.
pub async fn save_image_hints(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<ImageHintsBody>,
) -> ApiResult<Json<Value>> {
    let mut project = state.storage.get_project(id).await?.ok_or_else(project_not_found)?;
    let applied = project.apply_image_hints(&body.prompts);
    if applied > 0 {
        state
            .storage
            .save_pages(id, project.pages)
            .await?
            .ok_or_else(project_not_found)?;
    }
    Ok(Json(json!({ "msg": "saved", "applied": applied })))
}
