use sl_core::{Error, Result, StoryRecord};

pub const EXPORT_HEADER: [&str; 7] = ["id", "title", "category", "content", "source", "batch", "created_at"];

fn export_error(e: impl std::fmt::Display) -> Error {
    Error::Import(format!("Failed to write CSV: {}", e))
}

/// Renders stories as CSV, one row per story in the given order.
pub fn stories_to_csv(stories: &[StoryRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADER).map_err(export_error)?;
    for story in stories {
        writer
            .write_record([
                story.id.to_string().as_str(),
                story.title.as_str(),
                story.category.as_str(),
                story.content.as_str(),
                story.source.as_str(),
                story.batch.as_deref().unwrap_or(""),
                story.created_at.to_rfc3339().as_str(),
            ])
            .map_err(export_error)?;
    }
    let bytes = writer.into_inner().map_err(export_error)?;
    String::from_utf8(bytes).map_err(export_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import_csv;
    use sl_core::{NewStory, StoryFilter, StoryStorage};
    use sl_storage::InMemoryStorage;

    #[tokio::test]
    async fn test_export_quotes_and_reimports() {
        let source = InMemoryStorage::new();
        let story = source
            .insert_story(NewStory {
                title: "The Fox, the Crow".to_string(),
                content: "He said \"cheese\"\nand sang".to_string(),
                category: "Fables".to_string(),
                source: "Aesop".to_string(),
                batch: Some("b1".to_string()),
            })
            .await
            .unwrap();

        let csv = stories_to_csv(&[story.clone()]).unwrap();
        assert!(csv.starts_with("id,title,category,content,source,batch,created_at\n"));
        assert!(csv.contains("\"The Fox, the Crow\""));
        assert!(csv.contains(&story.created_at.to_rfc3339()));

        let target = InMemoryStorage::new();
        let summary = import_csv(&target, csv.as_bytes(), None).await.unwrap();
        assert_eq!(summary.success_count, 1);
        let copied = &target.list_stories(&StoryFilter::default()).await.unwrap()[0];
        assert_eq!(copied.title, story.title);
        assert_eq!(copied.content, story.content);
    }

    #[test]
    fn test_empty_export_has_header() {
        assert_eq!(stories_to_csv(&[]).unwrap(), "id,title,category,content,source,batch,created_at\n");
    }
}
