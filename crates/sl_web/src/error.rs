use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use sl_core::Error;
use tracing::error;

/// An HTTP error with a JSON body carrying at least `error`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self { status, body: json!({ "error": message }) }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Config(_) | Error::Import(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if !err.is_client_error() {
            error!("Request failed: {}", err);
        }

        let mut body = Map::new();
        body.insert("error".to_string(), Value::String(err.to_string()));
        // upstream API failures carry their own diagnostics
        if let Error::Completion { message, code, raw, .. } = &err {
            body.insert("api_message".to_string(), Value::String(message.clone()));
            if let Some(code) = code {
                body.insert("api_code".to_string(), Value::String(code.clone()));
            }
            if let Some(raw) = raw {
                body.insert("api_raw".to_string(), raw.clone());
            }
        }
        Self { status, body: Value::Object(body) }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
