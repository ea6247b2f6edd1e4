use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Category assigned when a caller does not name one.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Category used by the HTML importer for rows without one.
pub const IMPORT_DEFAULT_CATEGORY: &str = "未分类";

/// `source` value of stories saved by the AI collector.
pub const COLLECTOR_SOURCE: &str = "collector";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRecord {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub source: String,
    pub batch: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewStory {
    pub title: String,
    pub content: String,
    pub category: String,
    pub source: String,
    pub batch: Option<String>,
}

impl StoryRecord {
    /// Materializes a stored record from an insert payload.
    pub fn from_new(id: i64, story: NewStory, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: story.title,
            content: story.content,
            category: story.category,
            source: story.source,
            batch: story.batch,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: StoryPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(source) = patch.source {
            self.source = source;
        }
        if let Some(batch) = patch.batch {
            self.batch = Some(batch);
        }
        self.updated_at = now;
    }
}

/// Partial update of a story; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub batch: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub batch: Option<String>,
}

impl StoryFilter {
    pub fn matches(&self, story: &StoryRecord) -> bool {
        self.category.as_deref().map_or(true, |c| story.category == c)
            && self.batch.as_deref().map_or(true, |b| story.batch.as_deref() == Some(b))
    }
}

/// A story proposed by the model, not yet persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub id: i64,
    pub name: String,
    pub desc: String,
    pub image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewStyle {
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: i64,
    pub kind: String,
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPrompt {
    pub kind: String,
    pub name: String,
    pub content: String,
}

/// Status of a project nobody has moved forward yet.
pub const PROJECT_DRAFT: &str = "draft";

fn draft_status() -> String {
    PROJECT_DRAFT.to_string()
}

/// A picture-book project. Each page is a free-form JSON object such as
/// `{page_no, text_cn, text_en, image_hint}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub age_range: String,
    pub theme: String,
    pub style_id: Option<i64>,
    pub category_id: Option<i64>,
    pub summary: String,
    pub status: String,
    pub pages: Vec<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub age_range: String,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub style_id: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub summary: String,
    #[serde(default = "draft_status")]
    pub status: String,
    #[serde(default)]
    pub pages: Vec<Value>,
}

impl Default for NewProject {
    fn default() -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            age_range: String::new(),
            theme: String::new(),
            style_id: None,
            category_id: None,
            summary: String::new(),
            status: draft_status(),
            pages: Vec::new(),
        }
    }
}

/// Row of the project list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: i64,
    pub title: String,
    pub progress: f64,
    pub scene_count: usize,
    pub last_edit: DateTime<Utc>,
}

impl Project {
    pub fn from_new(id: i64, project: NewProject, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: project.title,
            author: project.author,
            age_range: project.age_range,
            theme: project.theme,
            style_id: project.style_id,
            category_id: project.category_id,
            summary: project.summary,
            status: project.status,
            pages: project.pages,
            created_at: now,
            updated_at: now,
        }
    }

    /// A project counts as done once it has any pages.
    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id,
            title: self.title.clone(),
            progress: if self.pages.is_empty() { 0.0 } else { 1.0 },
            scene_count: self.pages.len(),
            last_edit: self.updated_at,
        }
    }

    /// Writes `hints[i]` into page `i` as `image_hint`. Hints past the last
    /// page and pages that are not objects are skipped. Returns pages touched.
    pub fn apply_image_hints(&mut self, hints: &[Value]) -> usize {
        let mut applied = 0;
        for (page, hint) in self.pages.iter_mut().zip(hints) {
            if let Some(page) = page.as_object_mut() {
                page.insert("image_hint".to_string(), hint.clone());
                applied += 1;
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> StoryRecord {
        StoryRecord::from_new(
            7,
            NewStory {
                title: "The Lion and the Mouse".to_string(),
                content: "A small favor repaid.".to_string(),
                category: "Fables".to_string(),
                source: "manual".to_string(),
                batch: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_patch_keeps_absent_fields() {
        let mut story = record();
        let created = story.created_at;
        story.apply(
            StoryPatch {
                title: Some("The Mouse and the Lion".to_string()),
                ..Default::default()
            },
            created + chrono::Duration::seconds(5),
        );
        assert_eq!(story.title, "The Mouse and the Lion");
        assert_eq!(story.category, "Fables");
        assert_eq!(story.created_at, created);
        assert!(story.updated_at > created);
    }

    #[test]
    fn test_filter_matches_category_and_batch() {
        let mut story = record();
        story.batch = Some("2024-06".to_string());
        assert!(StoryFilter::default().matches(&story));
        assert!(StoryFilter { category: Some("Fables".to_string()), batch: None }.matches(&story));
        assert!(!StoryFilter { category: Some("Myths".to_string()), batch: None }.matches(&story));
        assert!(!StoryFilter { category: None, batch: Some("2024-07".to_string()) }.matches(&story));
    }

    #[test]
    fn test_new_project_defaults_to_draft() {
        let project: NewProject = serde_json::from_str(r#"{"title": "Moon Rabbit"}"#).unwrap();
        assert_eq!(project.status, PROJECT_DRAFT);
        assert!(project.pages.is_empty());
        assert_eq!(NewProject::default().status, PROJECT_DRAFT);
    }

    #[test]
    fn test_image_hints_fill_existing_pages_only() {
        let mut project = Project::from_new(
            1,
            NewProject {
                pages: vec![
                    serde_json::json!({"page_no": 1, "text_en": "One"}),
                    serde_json::json!({"page_no": 2, "text_en": "Two"}),
                ],
                ..Default::default()
            },
            Utc::now(),
        );
        let hints = vec![
            serde_json::json!("a moonlit field"),
            serde_json::json!("a rabbit waving"),
            serde_json::json!("no page for this"),
        ];
        assert_eq!(project.apply_image_hints(&hints), 2);
        assert_eq!(project.pages[0]["image_hint"], "a moonlit field");
        assert_eq!(project.pages[1]["text_en"], "Two");
        assert_eq!(project.pages.len(), 2);

        let summary = project.summary();
        assert_eq!(summary.scene_count, 2);
        assert_eq!(summary.progress, 1.0);
    }

    #[test]
    fn test_draft_tolerates_missing_fields() {
        let draft: StoryDraft = serde_json::from_str(r#"{"title":"A"}"#).unwrap();
        assert_eq!(draft.title, "A");
        assert!(draft.summary.is_empty());
        assert!(draft.category.is_empty());
    }
}
