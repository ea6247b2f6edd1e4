pub mod categories;
pub mod error;
pub mod models;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::{ChatMessage, CompletionClient, CompletionRequest};
pub use storage::{CatalogStorage, ProjectStorage, Storage, StoryStorage};
pub use types::*;

pub mod prelude {
    pub use crate::{Error, Result, Storage, StoryStorage, CatalogStorage, ProjectStorage, CompletionClient};
    pub use crate::types::{Category, NewStory, Project, StoryDraft, StoryRecord};
}
