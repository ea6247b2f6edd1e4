use axum::{
    routing::{get, post, put},
    Router,
};
use sl_core::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub mod error;
pub mod handlers;
pub mod settings;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use settings::SettingsStore;
pub use state::AppState;

use handlers::{catalog, collect, projects, settings as settings_handlers, stories};

pub fn create_app(state: AppState) -> Router {
    let api = Router::new()
        .route("/collect", post(collect::collect_stories))
        .route("/models", post(collect::list_models))
        .route("/stories", get(stories::list_stories))
        .route("/story/:id", put(stories::update_story).delete(stories::delete_story))
        .route("/stories/batch_delete", post(stories::batch_delete))
        .route("/stories/batch_export", post(stories::batch_export))
        .route("/stories/export", get(stories::export_stories))
        .route("/upload", post(stories::upload_csv))
        .route("/categories", get(catalog::list_categories).post(catalog::create_category))
        .route("/categories/merge", post(catalog::merge_categories))
        .route("/categories/:id", put(catalog::rename_category).delete(catalog::delete_category))
        .route("/styles", get(catalog::list_styles))
        .route("/styles/:id", get(catalog::get_style))
        .route("/prompts", get(catalog::list_prompts).post(catalog::create_prompt))
        .route("/prompts/:id", put(catalog::update_prompt).delete(catalog::delete_prompt))
        .route("/settings", get(settings_handlers::get_settings).post(settings_handlers::save_settings))
        .route("/script/generate", post(settings_handlers::generate_script))
        .route("/projects", get(projects::list_projects).post(projects::create_project))
        .route(
            "/projects/:id",
            get(projects::get_project)
                .patch(projects::rename_project)
                .delete(projects::delete_project),
        )
        .route("/projects/:id/script", post(projects::save_script))
        .route("/projects/:id/prompts", post(projects::save_image_hints));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🌐 Listening on http://{}", addr);
    axum::serve(listener, create_app(state)).await?;
    Ok(())
}

pub mod prelude {
    pub use crate::{create_app, serve, ApiError, AppState, SettingsStore};
    pub use sl_core::{Error, Result};
}
