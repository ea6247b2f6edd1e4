use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sl_core::types::{
    Category, NewProject, NewPrompt, NewStory, NewStyle, Project, Prompt, StoryFilter, StoryPatch,
    StoryRecord, Style,
};
use sl_core::{CatalogStorage, Error, ProjectStorage, Result, StoryStorage};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{ConnectOptions, Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS stories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        content TEXT NOT NULL DEFAULT '',
        category TEXT NOT NULL DEFAULT '',
        source TEXT NOT NULL DEFAULT '',
        batch TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        parent_id INTEGER REFERENCES categories(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS styles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        image TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS prompts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL DEFAULT '',
        name TEXT NOT NULL DEFAULT '',
        content TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL DEFAULT '',
        author TEXT NOT NULL DEFAULT '',
        age_range TEXT NOT NULL DEFAULT '',
        theme TEXT NOT NULL DEFAULT '',
        style_id INTEGER,
        category_id INTEGER,
        summary TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'draft',
        pages TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_stories_category ON stories(category)",
];

const STORY_COLUMNS: &str = "id, title, content, category, source, batch, created_at, updated_at";
const CATEGORY_COLUMNS: &str = "id, name, parent_id";
const STYLE_COLUMNS: &str = "id, name, description, image";
const PROMPT_COLUMNS: &str = "id, kind, name, content";
const PROJECT_COLUMNS: &str =
    "id, title, author, age_range, theme, style_id, category_id, summary, status, pages, created_at, updated_at";

fn db_error(action: &str, e: sqlx::Error) -> Error {
    Error::Database(format!("Failed to {}: {}", action, e))
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("Failed to parse date {}: {}", value, e)))
}

fn story_from_row(row: &SqliteRow) -> Result<StoryRecord> {
    let get = |e| db_error("read story row", e);
    Ok(StoryRecord {
        id: row.try_get("id").map_err(get)?,
        title: row.try_get("title").map_err(get)?,
        content: row.try_get("content").map_err(get)?,
        category: row.try_get("category").map_err(get)?,
        source: row.try_get("source").map_err(get)?,
        batch: row.try_get("batch").map_err(get)?,
        created_at: parse_time(&row.try_get::<String, _>("created_at").map_err(get)?)?,
        updated_at: parse_time(&row.try_get::<String, _>("updated_at").map_err(get)?)?,
    })
}

fn category_from_row(row: &SqliteRow) -> Result<Category> {
    let get = |e| db_error("read category row", e);
    Ok(Category {
        id: row.try_get("id").map_err(get)?,
        name: row.try_get("name").map_err(get)?,
        parent_id: row.try_get("parent_id").map_err(get)?,
    })
}

fn style_from_row(row: &SqliteRow) -> Result<Style> {
    let get = |e| db_error("read style row", e);
    Ok(Style {
        id: row.try_get("id").map_err(get)?,
        name: row.try_get("name").map_err(get)?,
        desc: row.try_get("description").map_err(get)?,
        image: row.try_get("image").map_err(get)?,
    })
}

fn prompt_from_row(row: &SqliteRow) -> Result<Prompt> {
    let get = |e| db_error("read prompt row", e);
    Ok(Prompt {
        id: row.try_get("id").map_err(get)?,
        kind: row.try_get("kind").map_err(get)?,
        name: row.try_get("name").map_err(get)?,
        content: row.try_get("content").map_err(get)?,
    })
}

fn project_from_row(row: &SqliteRow) -> Result<Project> {
    let get = |e| db_error("read project row", e);
    let pages: String = row.try_get("pages").map_err(get)?;
    Ok(Project {
        id: row.try_get("id").map_err(get)?,
        title: row.try_get("title").map_err(get)?,
        author: row.try_get("author").map_err(get)?,
        age_range: row.try_get("age_range").map_err(get)?,
        theme: row.try_get("theme").map_err(get)?,
        style_id: row.try_get("style_id").map_err(get)?,
        category_id: row.try_get("category_id").map_err(get)?,
        summary: row.try_get("summary").map_err(get)?,
        status: row.try_get("status").map_err(get)?,
        pages: serde_json::from_str(&pages)?,
        created_at: parse_time(&row.try_get::<String, _>("created_at").map_err(get)?)?,
        updated_at: parse_time(&row.try_get::<String, _>("updated_at").map_err(get)?)?,
    })
}

pub struct SQLiteStorage {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);

        // Schema changes must land before any pooled connection caches statements.
        let mut conn = options
            .connect()
            .await
            .map_err(|e| db_error("connect to database", e))?;
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&mut conn)
                .await
                .map_err(|e| db_error(&format!("run migration {}", i), e))?;
        }
        Self::ensure_batch_column(&mut conn).await?;
        conn.close().await.map_err(|e| db_error("close migration connection", e))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| db_error("connect to database", e))?;

        info!("🏦 SQLite storage ready at {}", db_path.display());
        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
        })
    }

    /// Databases created before batches existed lack the column.
    async fn ensure_batch_column(conn: &mut SqliteConnection) -> Result<()> {
        let columns = sqlx::query("PRAGMA table_info(stories)")
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| db_error("inspect stories table", e))?;
        let has_batch = columns
            .iter()
            .any(|row| row.try_get::<String, _>("name").map(|n| n == "batch").unwrap_or(false));
        if !has_batch {
            sqlx::query("ALTER TABLE stories ADD COLUMN batch TEXT")
                .execute(&mut *conn)
                .await
                .map_err(|e| db_error("add batch column", e))?;
            info!("➕ Added batch column to stories");
        }
        Ok(())
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }
}

#[async_trait]
impl StoryStorage for SQLiteStorage {
    async fn find_titles_by_category(&self, category: &str) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT title FROM stories WHERE category = ? ORDER BY id")
            .bind(category)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| db_error("list titles", e))?;
        rows.iter()
            .map(|row| row.try_get("title").map_err(|e| db_error("read title", e)))
            .collect()
    }

    async fn exists_by_title_or_content(&self, category: &str, title: &str, content: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM stories WHERE category = ?1 AND (title = ?2 OR (?3 != '' AND content = ?3)) LIMIT 1",
        )
        .bind(category)
        .bind(title)
        .bind(content)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| db_error("check duplicate story", e))?;
        Ok(row.is_some())
    }

    async fn exists_anywhere(&self, title: &str, content: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM stories WHERE title = ?1 OR (?2 != '' AND content = ?2) LIMIT 1")
            .bind(title)
            .bind(content)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| db_error("check duplicate story", e))?;
        Ok(row.is_some())
    }

    async fn insert_story(&self, story: NewStory) -> Result<StoryRecord> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO stories (title, content, category, source, batch, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&story.title)
        .bind(&story.content)
        .bind(&story.category)
        .bind(&story.source)
        .bind(story.batch.as_deref())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(|e| db_error("store story", e))?;

        Ok(StoryRecord::from_new(result.last_insert_rowid(), story, now))
    }

    async fn get_story(&self, id: i64) -> Result<Option<StoryRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM stories WHERE id = ?", STORY_COLUMNS))
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| db_error("get story", e))?;
        row.as_ref().map(story_from_row).transpose()
    }

    async fn list_stories(&self, filter: &StoryFilter) -> Result<Vec<StoryRecord>> {
        let sql = format!(
            "SELECT {} FROM stories WHERE (?1 IS NULL OR category = ?1) AND (?2 IS NULL OR batch = ?2) ORDER BY id",
            STORY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(filter.category.as_deref())
            .bind(filter.batch.as_deref())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| db_error("list stories", e))?;
        rows.iter().map(story_from_row).collect()
    }

    async fn get_stories(&self, ids: &[i64]) -> Result<Vec<StoryRecord>> {
        let mut stories = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(story) = self.get_story(*id).await? {
                stories.push(story);
            }
        }
        Ok(stories)
    }

    async fn update_story(&self, id: i64, patch: StoryPatch) -> Result<Option<StoryRecord>> {
        let Some(mut story) = self.get_story(id).await? else {
            return Ok(None);
        };
        story.apply(patch, Utc::now());
        sqlx::query(
            r#"
            UPDATE stories
            SET title = ?, content = ?, category = ?, source = ?, batch = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&story.title)
        .bind(&story.content)
        .bind(&story.category)
        .bind(&story.source)
        .bind(story.batch.as_deref())
        .bind(story.updated_at.to_rfc3339())
        .bind(id)
        .execute(&*self.pool)
        .await
        .map_err(|e| db_error("update story", e))?;
        Ok(Some(story))
    }

    async fn delete_story(&self, id: i64) -> Result<bool> {
        Ok(self.delete_stories(&[id]).await? > 0)
    }

    async fn delete_stories(&self, ids: &[i64]) -> Result<usize> {
        let mut deleted = 0;
        for id in ids {
            let result = sqlx::query("DELETE FROM stories WHERE id = ?")
                .bind(id)
                .execute(&*self.pool)
                .await
                .map_err(|e| db_error("delete story", e))?;
            deleted += result.rows_affected() as usize;
        }
        Ok(deleted)
    }

    async fn reassign_category(&self, from: &str, to: &str) -> Result<usize> {
        let result = sqlx::query("UPDATE stories SET category = ?, updated_at = ? WHERE category = ?")
            .bind(to)
            .bind(Utc::now().to_rfc3339())
            .bind(from)
            .execute(&*self.pool)
            .await
            .map_err(|e| db_error("reassign category", e))?;
        Ok(result.rows_affected() as usize)
    }

    async fn count_by_category(&self) -> Result<Vec<(String, usize)>> {
        let rows = sqlx::query(
            "SELECT category, COUNT(*) AS total FROM stories GROUP BY category ORDER BY MIN(id)",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| db_error("count stories", e))?;
        rows.iter()
            .map(|row| {
                let name: String = row.try_get("category").map_err(|e| db_error("read count", e))?;
                let total: i64 = row.try_get("total").map_err(|e| db_error("read count", e))?;
                Ok((name, total as usize))
            })
            .collect()
    }
}

#[async_trait]
impl CatalogStorage for SQLiteStorage {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(&format!("SELECT {} FROM categories ORDER BY id", CATEGORY_COLUMNS))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| db_error("list categories", e))?;
        rows.iter().map(category_from_row).collect()
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let row = sqlx::query(&format!("SELECT {} FROM categories WHERE name = ?", CATEGORY_COLUMNS))
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| db_error("find category", e))?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn insert_category(&self, name: &str, parent_id: Option<i64>) -> Result<Category> {
        if self.find_category_by_name(name).await?.is_some() {
            return Err(Error::Conflict(format!("Category already exists: {}", name)));
        }
        let result = sqlx::query("INSERT INTO categories (name, parent_id) VALUES (?, ?)")
            .bind(name)
            .bind(parent_id)
            .execute(&*self.pool)
            .await
            .map_err(|e| db_error("store category", e))?;
        Ok(Category { id: result.last_insert_rowid(), name: name.to_string(), parent_id })
    }

    async fn rename_category(&self, id: i64, name: &str) -> Result<Option<Category>> {
        if let Some(existing) = self.find_category_by_name(name).await? {
            if existing.id != id {
                return Err(Error::Conflict(format!("Category already exists: {}", name)));
            }
        }
        sqlx::query("UPDATE categories SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| db_error("rename category", e))?;
        let row = sqlx::query(&format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_COLUMNS))
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| db_error("get category", e))?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn delete_category(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| db_error("delete category", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_styles(&self) -> Result<Vec<Style>> {
        let rows = sqlx::query(&format!("SELECT {} FROM styles ORDER BY id", STYLE_COLUMNS))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| db_error("list styles", e))?;
        rows.iter().map(style_from_row).collect()
    }

    async fn get_style(&self, id: i64) -> Result<Option<Style>> {
        let row = sqlx::query(&format!("SELECT {} FROM styles WHERE id = ?", STYLE_COLUMNS))
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| db_error("get style", e))?;
        row.as_ref().map(style_from_row).transpose()
    }

    async fn insert_style(&self, style: NewStyle) -> Result<Style> {
        let result = sqlx::query("INSERT INTO styles (name, description, image) VALUES (?, ?, ?)")
            .bind(&style.name)
            .bind(&style.desc)
            .bind(&style.image)
            .execute(&*self.pool)
            .await
            .map_err(|e| db_error("store style", e))?;
        Ok(Style { id: result.last_insert_rowid(), name: style.name, desc: style.desc, image: style.image })
    }

    async fn list_prompts(&self, kind: Option<&str>) -> Result<Vec<Prompt>> {
        let rows = sqlx::query(&format!("SELECT {} FROM prompts WHERE (?1 IS NULL OR kind = ?1) ORDER BY id", PROMPT_COLUMNS))
            .bind(kind)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| db_error("list prompts", e))?;
        rows.iter().map(prompt_from_row).collect()
    }

    async fn insert_prompt(&self, prompt: NewPrompt) -> Result<Prompt> {
        let result = sqlx::query("INSERT INTO prompts (kind, name, content) VALUES (?, ?, ?)")
            .bind(&prompt.kind)
            .bind(&prompt.name)
            .bind(&prompt.content)
            .execute(&*self.pool)
            .await
            .map_err(|e| db_error("store prompt", e))?;
        Ok(Prompt { id: result.last_insert_rowid(), kind: prompt.kind, name: prompt.name, content: prompt.content })
    }

    async fn update_prompt(&self, id: i64, prompt: NewPrompt) -> Result<Option<Prompt>> {
        let result = sqlx::query("UPDATE prompts SET kind = ?, name = ?, content = ? WHERE id = ?")
            .bind(&prompt.kind)
            .bind(&prompt.name)
            .bind(&prompt.content)
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| db_error("update prompt", e))?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(Prompt { id, kind: prompt.kind, name: prompt.name, content: prompt.content }))
    }

    async fn delete_prompt(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM prompts WHERE id = ?")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| db_error("delete prompt", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProjectStorage for SQLiteStorage {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let rows = sqlx::query(&format!("SELECT {} FROM projects ORDER BY id", PROJECT_COLUMNS))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| db_error("list projects", e))?;
        rows.iter().map(project_from_row).collect()
    }

    async fn insert_project(&self, project: NewProject) -> Result<Project> {
        let now = Utc::now();
        let pages = serde_json::to_string(&project.pages)?;
        let result = sqlx::query(
            r#"
            INSERT INTO projects (title, author, age_range, theme, style_id, category_id, summary, status, pages, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&project.title)
        .bind(&project.author)
        .bind(&project.age_range)
        .bind(&project.theme)
        .bind(project.style_id)
        .bind(project.category_id)
        .bind(&project.summary)
        .bind(&project.status)
        .bind(pages)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(|e| db_error("store project", e))?;

        Ok(Project::from_new(result.last_insert_rowid(), project, now))
    }

    async fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let row = sqlx::query(&format!("SELECT {} FROM projects WHERE id = ?", PROJECT_COLUMNS))
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| db_error("get project", e))?;
        row.as_ref().map(project_from_row).transpose()
    }

    async fn rename_project(&self, id: i64, title: &str) -> Result<Option<Project>> {
        let result = sqlx::query("UPDATE projects SET title = ?, updated_at = ? WHERE id = ?")
            .bind(title)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| db_error("rename project", e))?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_project(id).await
    }

    async fn save_pages(&self, id: i64, pages: Vec<Value>) -> Result<Option<Project>> {
        let result = sqlx::query("UPDATE projects SET pages = ?, updated_at = ? WHERE id = ?")
            .bind(serde_json::to_string(&pages)?)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| db_error("save project pages", e))?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_project(id).await
    }

    async fn delete_project(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| db_error("delete project", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn story(title: &str, content: &str, category: &str, batch: Option<&str>) -> NewStory {
        NewStory {
            title: title.to_string(),
            content: content.to_string(),
            category: category.to_string(),
            source: "test".to_string(),
            batch: batch.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_sqlite_storage() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("stories.db");
        let storage = SQLiteStorage::new_with_path(&db_path).await.unwrap();

        let saved = storage
            .insert_story(story("Fox and Grapes", "Sour grapes.", "Fables", Some("b1")))
            .await
            .unwrap();
        storage.insert_story(story("Thunder Bird", "Storms.", "Myths", None)).await.unwrap();

        assert_eq!(storage.find_titles_by_category("Fables").await.unwrap(), vec!["Fox and Grapes"]);
        assert!(storage.exists_by_title_or_content("Fables", "x", "Sour grapes.").await.unwrap());
        assert!(!storage.exists_by_title_or_content("Myths", "Fox and Grapes", "x").await.unwrap());

        let by_batch = storage
            .list_stories(&StoryFilter { category: None, batch: Some("b1".to_string()) })
            .await
            .unwrap();
        assert_eq!(by_batch.len(), 1);
        assert_eq!(by_batch[0].id, saved.id);
        assert_eq!(storage.list_stories(&StoryFilter::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sqlite_reopen_keeps_data() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("stories.db");
        {
            let storage = SQLiteStorage::new_with_path(&db_path).await.unwrap();
            storage.insert_category("Fables", None).await.unwrap();
            storage.insert_story(story("A", "a", "Fables", None)).await.unwrap();
        }
        let storage = SQLiteStorage::new_with_path(&db_path).await.unwrap();
        assert_eq!(storage.list_categories().await.unwrap().len(), 1);
        assert_eq!(storage.count_by_category().await.unwrap(), vec![("Fables".to_string(), 1)]);
        assert!(matches!(storage.insert_category("Fables", None).await, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_sqlite_update_and_reassign() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("s.db")).await.unwrap();
        let a = storage.insert_story(story("A", "a", "fairy-tales", None)).await.unwrap();

        let patched = storage
            .update_story(a.id, StoryPatch { title: Some("A2".to_string()), ..Default::default() })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(patched.title, "A2");
        assert_eq!(storage.get_story(a.id).await.unwrap().unwrap().title, "A2");

        assert_eq!(storage.reassign_category("fairy-tales", "Fairy Tales").await.unwrap(), 1);
        assert_eq!(storage.find_titles_by_category("Fairy Tales").await.unwrap(), vec!["A2"]);
        assert!(storage.delete_story(a.id).await.unwrap());
        assert!(storage.get_story(a.id).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sqlite_fresh_db_reads_back_every_insert() {
        let temp_dir = tempdir().unwrap();
        let storage = Arc::new(SQLiteStorage::new_with_path(&temp_dir.path().join("fresh.db")).await.unwrap());

        let mut ids = Vec::new();
        for i in 0..8 {
            let saved = storage
                .insert_story(story(&format!("S{}", i), &format!("s{}", i), "Fables", Some("b")))
                .await
                .unwrap();
            ids.push(saved.id);
        }

        // concurrent reads check out several pooled connections
        let handles: Vec<_> = ids
            .iter()
            .map(|id| {
                let storage = storage.clone();
                let id = *id;
                tokio::spawn(async move { storage.get_story(id).await })
            })
            .collect();
        for (handle, id) in handles.into_iter().zip(&ids) {
            assert_eq!(handle.await.unwrap().unwrap().unwrap().id, *id);
        }
        assert_eq!(storage.get_stories(&ids).await.unwrap().len(), ids.len());
        let listed = storage
            .list_stories(&StoryFilter { category: None, batch: Some("b".to_string()) })
            .await
            .unwrap();
        assert_eq!(listed.len(), ids.len());
    }

    #[tokio::test]
    async fn test_sqlite_upgrades_database_without_batch() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("legacy.db");
        {
            let options = SqliteConnectOptions::new().filename(&db_path).create_if_missing(true);
            let mut conn = options.connect().await.unwrap();
            sqlx::query(
                "CREATE TABLE stories (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT NOT NULL, \
                 content TEXT NOT NULL DEFAULT '', category TEXT NOT NULL DEFAULT '', \
                 source TEXT NOT NULL DEFAULT '', created_at TEXT NOT NULL, updated_at TEXT NOT NULL)",
            )
            .execute(&mut conn)
            .await
            .unwrap();
            conn.close().await.unwrap();
        }

        let storage = SQLiteStorage::new_with_path(&db_path).await.unwrap();
        let saved = storage.insert_story(story("Old", "old", "Fables", Some("b2"))).await.unwrap();
        let fetched = storage.get_story(saved.id).await.unwrap().unwrap();
        assert_eq!(fetched.batch.as_deref(), Some("b2"));
        let listed = storage.list_stories(&StoryFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_projects() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("p.db")).await.unwrap();
        let project = storage
            .insert_project(NewProject { title: "Moon Rabbit".to_string(), style_id: Some(3), ..Default::default() })
            .await
            .unwrap();

        let pages = vec![serde_json::json!({"page_no": 1, "text_cn": "跳", "text_en": "Hop"})];
        storage.save_pages(project.id, pages.clone()).await.unwrap().unwrap();
        let fetched = storage.get_project(project.id).await.unwrap().unwrap();
        assert_eq!(fetched.pages, pages);
        assert_eq!(fetched.style_id, Some(3));
        assert_eq!(fetched.status, "draft");

        assert_eq!(storage.rename_project(project.id, "Sun Rabbit").await.unwrap().unwrap().title, "Sun Rabbit");
        assert!(storage.rename_project(999, "x").await.unwrap().is_none());
        assert_eq!(storage.list_projects().await.unwrap().len(), 1);
        assert!(storage.delete_project(project.id).await.unwrap());
        assert!(!storage.delete_project(project.id).await.unwrap());
    }
}
