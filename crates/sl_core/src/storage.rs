use async_trait::async_trait;
use serde_json::Value;
use crate::types::{
    Category, NewProject, NewPrompt, NewStory, NewStyle, Project, Prompt, StoryFilter, StoryPatch,
    StoryRecord, Style,
};
use crate::Result;

#[async_trait]
pub trait StoryStorage: Send + Sync {
    /// Titles of every story stored under `category`, in insertion order
    async fn find_titles_by_category(&self, category: &str) -> Result<Vec<String>>;

    /// Whether `category` already holds a story with this title or this content
    async fn exists_by_title_or_content(&self, category: &str, title: &str, content: &str) -> Result<bool>;

    /// Whether any story, in any category, has this title or this content
    async fn exists_anywhere(&self, title: &str, content: &str) -> Result<bool>;

    /// Persist a story and return it with its assigned id
    async fn insert_story(&self, story: NewStory) -> Result<StoryRecord>;

    async fn get_story(&self, id: i64) -> Result<Option<StoryRecord>>;

    async fn list_stories(&self, filter: &StoryFilter) -> Result<Vec<StoryRecord>>;

    /// Fetch stories by id, preserving the order of `ids` and skipping unknown ones
    async fn get_stories(&self, ids: &[i64]) -> Result<Vec<StoryRecord>>;

    async fn update_story(&self, id: i64, patch: StoryPatch) -> Result<Option<StoryRecord>>;

    async fn delete_story(&self, id: i64) -> Result<bool>;

    /// Delete many stories, returning how many existed
    async fn delete_stories(&self, ids: &[i64]) -> Result<usize>;

    /// Move every story from category `from` to category `to`
    async fn reassign_category(&self, from: &str, to: &str) -> Result<usize>;

    /// Story count per category name
    async fn count_by_category(&self) -> Result<Vec<(String, usize)>>;
}

#[async_trait]
pub trait CatalogStorage: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>>;

    async fn insert_category(&self, name: &str, parent_id: Option<i64>) -> Result<Category>;

    async fn rename_category(&self, id: i64, name: &str) -> Result<Option<Category>>;

    async fn delete_category(&self, id: i64) -> Result<bool>;

    async fn list_styles(&self) -> Result<Vec<Style>>;

    async fn get_style(&self, id: i64) -> Result<Option<Style>>;

    async fn insert_style(&self, style: NewStyle) -> Result<Style>;

    async fn list_prompts(&self, kind: Option<&str>) -> Result<Vec<Prompt>>;

    async fn insert_prompt(&self, prompt: NewPrompt) -> Result<Prompt>;

    async fn update_prompt(&self, id: i64, prompt: NewPrompt) -> Result<Option<Prompt>>;

    async fn delete_prompt(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait ProjectStorage: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>>;

    async fn insert_project(&self, project: NewProject) -> Result<Project>;

    async fn get_project(&self, id: i64) -> Result<Option<Project>>;

    async fn rename_project(&self, id: i64, title: &str) -> Result<Option<Project>>;

    /// Replace every page of a project
    async fn save_pages(&self, id: i64, pages: Vec<Value>) -> Result<Option<Project>>;

    async fn delete_project(&self, id: i64) -> Result<bool>;
}

/// Everything a backend provides.
pub trait Storage: StoryStorage + CatalogStorage + ProjectStorage {}

impl<T: StoryStorage + CatalogStorage + ProjectStorage + ?Sized> Storage for T {}

/// Fetch a category by name, creating it when missing.
pub async fn ensure_category<S: CatalogStorage + ?Sized>(storage: &S, name: &str) -> Result<Category> {
    match storage.find_category_by_name(name).await? {
        Some(category) => Ok(category),
        None => storage.insert_category(name, None).await,
    }
}
