use scraper::{ElementRef, Html, Selector};
use sl_core::storage::ensure_category;
use sl_core::{Error, NewStory, Result, Storage, IMPORT_DEFAULT_CATEGORY};
use tracing::{debug, info};

use crate::ImportSummary;

/// `source` of imported rows that name no classic source.
pub const HTML_IMPORT_SOURCE: &str = "html_import";

/// One data row of an exported task table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlStoryRow {
    pub title: String,
    pub category: String,
    pub summary: String,
    pub content: String,
    pub classic_source: String,
}

impl HtmlStoryRow {
    fn into_story(self, batch: Option<&str>) -> NewStory {
        let content = if self.summary.is_empty() { self.content } else { self.summary };
        let source = if self.classic_source.is_empty() {
            HTML_IMPORT_SOURCE.to_string()
        } else {
            self.classic_source
        };
        NewStory {
            title: self.title,
            content,
            category: self.category,
            source,
            batch: batch.map(str::to_string),
        }
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Import(format!("Invalid selector {}: {:?}", css, e)))
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().map(str::trim).collect()
}

/// Reads the first `<table>`, skipping its header row.
///
/// Rows with fewer than five cells or an empty title are dropped.
pub fn parse_html_table(html: &str) -> Result<Vec<HtmlStoryRow>> {
    let document = Html::parse_document(html);
    let table_selector = selector("table")?;
    let row_selector = selector("tr")?;
    let cell_selector = selector("td")?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| Error::Import("No table found in HTML document".to_string()))?;

    let mut rows = Vec::new();
    for row in table.select(&row_selector).skip(1) {
        let cells: Vec<String> = row.select(&cell_selector).map(|c| cell_text(&c)).collect();
        if cells.len() < 5 || cells[0].is_empty() {
            continue;
        }
        let mut cells = cells.into_iter();
        let mut next = || cells.next().unwrap_or_default();
        let title = next();
        let category = next();
        rows.push(HtmlStoryRow {
            title,
            category: if category.is_empty() { IMPORT_DEFAULT_CATEGORY.to_string() } else { category },
            summary: next(),
            content: next(),
            classic_source: next(),
        });
    }
    debug!("Parsed {} rows from HTML table", rows.len());
    Ok(rows)
}

/// Parses and stores an HTML table export, creating missing categories.
///
/// Rows whose title is already stored are counted as duplicates.
pub async fn import_html<S: Storage + ?Sized>(
    storage: &S,
    html: &str,
    batch: Option<&str>,
) -> Result<ImportSummary> {
    let rows = parse_html_table(html)?;
    let batch = batch.map(str::trim).filter(|b| !b.is_empty());
    let mut summary = ImportSummary::default();

    for row in rows {
        ensure_category(storage, &row.category).await?;
        // empty content never matches, so this is a title-only check
        if storage.exists_anywhere(&row.title, "").await? {
            debug!("Skipping existing title: {}", row.title);
            summary.duplicate_count += 1;
            continue;
        }
        storage.insert_story(row.into_story(batch)).await?;
        summary.success_count += 1;
    }

    info!(
        "📥 HTML import finished: {} saved, {} duplicates",
        summary.success_count, summary.duplicate_count
    );
    Ok(summary)
}
