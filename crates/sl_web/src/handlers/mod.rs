pub mod catalog;
pub mod collect;
pub mod projects;
pub mod settings;
pub mod stories;

use axum::http::header;
use axum::response::{IntoResponse, Response};

/// Wraps a CSV body as a download.
pub(crate) fn csv_attachment(body: String, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        body,
    )
        .into_response()
}

/// Query strings send `?category=` for "no filter".
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
