pub mod csv_import;
pub mod export;
pub mod html;
pub mod styles;

use serde::{Deserialize, Serialize};

pub use csv_import::import_csv;
pub use export::stories_to_csv;
pub use html::{import_html, parse_html_table, HtmlStoryRow};
pub use styles::{seed_styles, BUILTIN_STYLES};

/// Counts reported by every importer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub success_count: usize,
    pub duplicate_count: usize,
}

pub mod prelude {
    pub use crate::{import_csv, import_html, parse_html_table, seed_styles, stories_to_csv, ImportSummary};
}
