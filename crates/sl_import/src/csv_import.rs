use sl_core::storage::ensure_category;
use sl_core::{Error, NewStory, Result, Storage};
use tracing::{debug, info};

use crate::ImportSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Title,
    Category,
    Content,
    Source,
}

/// Spreadsheet exports use the Chinese headers, hand-written files the English ones.
fn column_for(header: &str) -> Option<Column> {
    match header.trim().trim_start_matches('\u{feff}') {
        "名称" | "title" => Some(Column::Title),
        "故事分类" | "category" => Some(Column::Category),
        "简介" | "content" => Some(Column::Content),
        "source" => Some(Column::Source),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct ColumnIndex {
    title: Option<usize>,
    category: Option<usize>,
    content: Option<usize>,
    source: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let mut index = Self::default();
        for (i, header) in headers.iter().enumerate() {
            let slot = match column_for(header) {
                Some(Column::Title) => &mut index.title,
                Some(Column::Category) => &mut index.category,
                Some(Column::Content) => &mut index.content,
                Some(Column::Source) => &mut index.source,
                None => continue,
            };
            // first matching header wins
            slot.get_or_insert(i);
        }
        index
    }

    fn field(record: &csv::StringRecord, column: Option<usize>) -> String {
        column
            .and_then(|i| record.get(i))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }
}

/// Imports CSV rows as stories.
///
/// A row whose title or content is already stored under any category counts
/// as a duplicate, including rows repeated earlier in the same file.
pub async fn import_csv<S: Storage + ?Sized>(
    storage: &S,
    data: &[u8],
    batch: Option<&str>,
) -> Result<ImportSummary> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);
    let headers = reader
        .headers()
        .map_err(|e| Error::Import(format!("Failed to read CSV header: {}", e)))?
        .clone();
    let index = ColumnIndex::from_headers(&headers);
    if index.title.is_none() && index.content.is_none() {
        return Err(Error::Import("CSV has neither a title nor a content column".to_string()));
    }

    let batch = batch.map(str::trim).filter(|b| !b.is_empty());
    let mut summary = ImportSummary::default();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| Error::Import(format!("Failed to read CSV row {}: {}", line + 1, e)))?;
        let title = ColumnIndex::field(&record, index.title);
        let content = ColumnIndex::field(&record, index.content);
        if title.is_empty() && content.is_empty() {
            continue;
        }

        if storage.exists_anywhere(&title, &content).await? {
            debug!("Skipping duplicate CSV row: {}", title);
            summary.duplicate_count += 1;
            continue;
        }

        let category = ColumnIndex::field(&record, index.category);
        if !category.is_empty() {
            ensure_category(storage, &category).await?;
        }
        storage
            .insert_story(NewStory {
                title,
                content,
                category,
                source: ColumnIndex::field(&record, index.source),
                batch: batch.map(str::to_string),
            })
            .await?;
        summary.success_count += 1;
    }

    info!(
        "📥 CSV import finished: {} saved, {} duplicates",
        summary.success_count, summary.duplicate_count
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sl_core::{CatalogStorage, StoryFilter, StoryStorage};
    use sl_storage::InMemoryStorage;

    #[tokio::test]
    async fn test_chinese_headers_are_mapped() {
        let storage = InMemoryStorage::new();
        let data = "名称,故事分类,简介,source\n狐狸和葡萄,寓言,狐狸够不着葡萄,伊索\n";
        let summary = import_csv(&storage, data.as_bytes(), Some("b1")).await.unwrap();
        assert_eq!(summary, ImportSummary { success_count: 1, duplicate_count: 0 });

        let stories = storage.list_stories(&StoryFilter::default()).await.unwrap();
        assert_eq!(stories[0].title, "狐狸和葡萄");
        assert_eq!(stories[0].category, "寓言");
        assert_eq!(stories[0].content, "狐狸够不着葡萄");
        assert_eq!(stories[0].source, "伊索");
        assert_eq!(stories[0].batch.as_deref(), Some("b1"));
        assert!(storage.find_category_by_name("寓言").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicates_by_title_or_content() {
        let storage = InMemoryStorage::new();
        storage
            .insert_story(NewStory {
                title: "Fox and Grapes".to_string(),
                content: "A fox wants grapes".to_string(),
                category: "Fables".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let data = "title,category,content\n\
            Fox and Grapes,Myths,something else\n\
            Other title,Myths,A fox wants grapes\n\
            The Lion,Fables,A lion spares a mouse\n\
            The Lion,Fables,Repeated in the same file\n";
        let summary = import_csv(&storage, data.as_bytes(), None).await.unwrap();
        assert_eq!(summary, ImportSummary { success_count: 1, duplicate_count: 3 });

        let lion = storage.list_stories(&StoryFilter::default()).await.unwrap().pop().unwrap();
        assert_eq!(lion.title, "The Lion");
        assert_eq!(lion.batch, None);
    }

    #[tokio::test]
    async fn test_missing_columns_and_blank_rows() {
        let storage = InMemoryStorage::new();
        let data = "title\nOnly a title\n\n,\n";
        let summary = import_csv(&storage, data.as_bytes(), Some("  ")).await.unwrap();
        assert_eq!(summary.success_count, 1);

        let story = &storage.list_stories(&StoryFilter::default()).await.unwrap()[0];
        assert_eq!(story.content, "");
        assert_eq!(story.category, "");
        assert_eq!(story.batch, None);
    }

    #[tokio::test]
    async fn test_unknown_headers_rejected() {
        let storage = InMemoryStorage::new();
        let err = import_csv(&storage, b"foo,bar\n1,2\n", None).await.unwrap_err();
        assert!(matches!(err, Error::Import(_)));
    }
}
