use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The completion endpoint answered with a non-success status.
    #[error("Completion API call failed ({status}): {message}")]
    Completion {
        status: u16,
        message: String,
        code: Option<String>,
        raw: Option<serde_json::Value>,
    },

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// True for failures caused by the caller's input rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Config(_) | Error::NotFound(_) | Error::Conflict(_) | Error::Import(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
