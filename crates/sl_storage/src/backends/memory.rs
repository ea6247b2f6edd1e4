use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sl_core::types::{
    Category, NewProject, NewPrompt, NewStory, NewStyle, Project, Prompt, StoryFilter, StoryPatch,
    StoryRecord, Style,
};
use sl_core::{CatalogStorage, Error, ProjectStorage, Result, StoryStorage};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Same title, or same non-empty content.
fn same_story(story: &StoryRecord, title: &str, content: &str) -> bool {
    story.title == title || (!content.is_empty() && story.content == content)
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    stories: Vec<StoryRecord>,
    categories: Vec<Category>,
    styles: Vec<Style>,
    prompts: Vec<Prompt>,
    projects: Vec<Project>,
    next_id: i64,
}

impl MemoryStore {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn insert_story(&mut self, story: NewStory) -> StoryRecord {
        let id = self.next_id();
        let record = StoryRecord::from_new(id, story, Utc::now());
        self.stories.push(record.clone());
        record
    }

    pub fn update_story(&mut self, id: i64, patch: StoryPatch) -> Option<StoryRecord> {
        let story = self.stories.iter_mut().find(|s| s.id == id)?;
        story.apply(patch, Utc::now());
        Some(story.clone())
    }

    pub fn delete_stories(&mut self, ids: &[i64]) -> usize {
        let before = self.stories.len();
        self.stories.retain(|s| !ids.contains(&s.id));
        before - self.stories.len()
    }

    pub fn reassign_category(&mut self, from: &str, to: &str) -> usize {
        let mut moved = 0;
        for story in self.stories.iter_mut().filter(|s| s.category == from) {
            story.category = to.to_string();
            story.updated_at = Utc::now();
            moved += 1;
        }
        moved
    }

    pub fn insert_category(&mut self, name: &str, parent_id: Option<i64>) -> Result<Category> {
        if self.categories.iter().any(|c| c.name == name) {
            return Err(Error::Conflict(format!("Category already exists: {}", name)));
        }
        let category = Category { id: self.next_id(), name: name.to_string(), parent_id };
        self.categories.push(category.clone());
        Ok(category)
    }
}

/// Process-local backend; contents vanish with the process.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoryStorage for InMemoryStorage {
    async fn find_titles_by_category(&self, category: &str) -> Result<Vec<String>> {
        let store = self.store.read().await;
        Ok(store.stories.iter()
            .filter(|s| s.category == category)
            .map(|s| s.title.clone())
            .collect())
    }

    async fn exists_by_title_or_content(&self, category: &str, title: &str, content: &str) -> Result<bool> {
        let store = self.store.read().await;
        Ok(store.stories.iter()
            .any(|s| s.category == category && same_story(s, title, content)))
    }

    async fn exists_anywhere(&self, title: &str, content: &str) -> Result<bool> {
        let store = self.store.read().await;
        Ok(store.stories.iter().any(|s| same_story(s, title, content)))
    }

    async fn insert_story(&self, story: NewStory) -> Result<StoryRecord> {
        let mut store = self.store.write().await;
        Ok(store.insert_story(story))
    }

    async fn get_story(&self, id: i64) -> Result<Option<StoryRecord>> {
        let store = self.store.read().await;
        Ok(store.stories.iter().find(|s| s.id == id).cloned())
    }

    async fn list_stories(&self, filter: &StoryFilter) -> Result<Vec<StoryRecord>> {
        let store = self.store.read().await;
        Ok(store.stories.iter().filter(|s| filter.matches(s)).cloned().collect())
    }

    async fn get_stories(&self, ids: &[i64]) -> Result<Vec<StoryRecord>> {
        let store = self.store.read().await;
        Ok(ids.iter()
            .filter_map(|id| store.stories.iter().find(|s| s.id == *id).cloned())
            .collect())
    }

    async fn update_story(&self, id: i64, patch: StoryPatch) -> Result<Option<StoryRecord>> {
        let mut store = self.store.write().await;
        Ok(store.update_story(id, patch))
    }

    async fn delete_story(&self, id: i64) -> Result<bool> {
        let mut store = self.store.write().await;
        Ok(store.delete_stories(&[id]) > 0)
    }

    async fn delete_stories(&self, ids: &[i64]) -> Result<usize> {
        let mut store = self.store.write().await;
        Ok(store.delete_stories(ids))
    }

    async fn reassign_category(&self, from: &str, to: &str) -> Result<usize> {
        let mut store = self.store.write().await;
        Ok(store.reassign_category(from, to))
    }

    async fn count_by_category(&self) -> Result<Vec<(String, usize)>> {
        let store = self.store.read().await;
        let mut counts: Vec<(String, usize)> = Vec::new();
        for story in &store.stories {
            match counts.iter_mut().find(|(name, _)| *name == story.category) {
                Some((_, count)) => *count += 1,
                None => counts.push((story.category.clone(), 1)),
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl CatalogStorage for InMemoryStorage {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.store.read().await.categories.clone())
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let store = self.store.read().await;
        Ok(store.categories.iter().find(|c| c.name == name).cloned())
    }

    async fn insert_category(&self, name: &str, parent_id: Option<i64>) -> Result<Category> {
        let mut store = self.store.write().await;
        store.insert_category(name, parent_id)
    }

    async fn rename_category(&self, id: i64, name: &str) -> Result<Option<Category>> {
        let mut store = self.store.write().await;
        if store.categories.iter().any(|c| c.name == name && c.id != id) {
            return Err(Error::Conflict(format!("Category already exists: {}", name)));
        }
        Ok(store.categories.iter_mut().find(|c| c.id == id).map(|c| {
            c.name = name.to_string();
            c.clone()
        }))
    }

    async fn delete_category(&self, id: i64) -> Result<bool> {
        let mut store = self.store.write().await;
        let before = store.categories.len();
        store.categories.retain(|c| c.id != id);
        Ok(store.categories.len() < before)
    }

    async fn list_styles(&self) -> Result<Vec<Style>> {
        Ok(self.store.read().await.styles.clone())
    }

    async fn get_style(&self, id: i64) -> Result<Option<Style>> {
        let store = self.store.read().await;
        Ok(store.styles.iter().find(|s| s.id == id).cloned())
    }

    async fn insert_style(&self, style: NewStyle) -> Result<Style> {
        let mut store = self.store.write().await;
        let style = Style { id: store.next_id(), name: style.name, desc: style.desc, image: style.image };
        store.styles.push(style.clone());
        Ok(style)
    }

    async fn list_prompts(&self, kind: Option<&str>) -> Result<Vec<Prompt>> {
        let store = self.store.read().await;
        Ok(store.prompts.iter()
            .filter(|p| kind.map_or(true, |k| p.kind == k))
            .cloned()
            .collect())
    }

    async fn insert_prompt(&self, prompt: NewPrompt) -> Result<Prompt> {
        let mut store = self.store.write().await;
        let prompt = Prompt { id: store.next_id(), kind: prompt.kind, name: prompt.name, content: prompt.content };
        store.prompts.push(prompt.clone());
        Ok(prompt)
    }

    async fn update_prompt(&self, id: i64, prompt: NewPrompt) -> Result<Option<Prompt>> {
        let mut store = self.store.write().await;
        Ok(store.prompts.iter_mut().find(|p| p.id == id).map(|p| {
            p.kind = prompt.kind;
            p.name = prompt.name;
            p.content = prompt.content;
            p.clone()
        }))
    }

    async fn delete_prompt(&self, id: i64) -> Result<bool> {
        let mut store = self.store.write().await;
        let before = store.prompts.len();
        store.prompts.retain(|p| p.id != id);
        Ok(store.prompts.len() < before)
    }
}

#[async_trait]
impl ProjectStorage for InMemoryStorage {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.store.read().await.projects.clone())
    }

    async fn insert_project(&self, project: NewProject) -> Result<Project> {
        let mut store = self.store.write().await;
        let project = Project::from_new(store.next_id(), project, Utc::now());
        store.projects.push(project.clone());
        Ok(project)
    }

    async fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let store = self.store.read().await;
        Ok(store.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn rename_project(&self, id: i64, title: &str) -> Result<Option<Project>> {
        let mut store = self.store.write().await;
        Ok(store.projects.iter_mut().find(|p| p.id == id).map(|p| {
            p.title = title.to_string();
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn save_pages(&self, id: i64, pages: Vec<Value>) -> Result<Option<Project>> {
        let mut store = self.store.write().await;
        Ok(store.projects.iter_mut().find(|p| p.id == id).map(|p| {
            p.pages = pages;
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn delete_project(&self, id: i64) -> Result<bool> {
        let mut store = self.store.write().await;
        let before = store.projects.len();
        store.projects.retain(|p| p.id != id);
        Ok(store.projects.len() < before)
    }
}
