use sl_core::Result;
use std::path::Path;
use tracing::{info, warn};

/// Used when no template file is available.
pub const DEFAULT_COLLECT_TEMPLATE: &str = r#"You are an editor collecting children's stories for the category "{category}".

Return exactly {N} stories that belong to "{category}". Do not return any of
these titles, which are already in the library: {titles}

Answer with a JSON array only, no commentary. Each element must be an object
with these string fields:
- "title": the story's title
- "summary": a two or three sentence synopsis
- "category": exactly "{category}"
"#;

/// Collection prompt with `{N}`, `{titles}` and `{category}` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_COLLECT_TEMPLATE)
    }
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into() }
    }

    /// Read the template from disk, falling back to the built-in one if the file is missing.
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(template) => {
                info!("📜 Loaded prompt template from {}", path.display());
                Ok(Self::new(template))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Prompt template {} not found, using built-in template", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Substitutes in one pass, so placeholder text inside a title or category stays literal.
    pub fn render(&self, need: usize, titles: &[String], category: &str) -> String {
        let need = need.to_string();
        let titles = titles.join("，");
        let values = [("{N}", need.as_str()), ("{titles}", titles.as_str()), ("{category}", category)];

        let mut rendered = String::with_capacity(self.template.len() + titles.len());
        let mut rest = self.template.as_str();
        while let Some(start) = rest.find('{') {
            rendered.push_str(&rest[..start]);
            let tail = &rest[start..];
            match values.iter().find(|(key, _)| tail.starts_with(key)) {
                Some((key, value)) => {
                    rendered.push_str(value);
                    rest = &tail[key.len()..];
                }
                None => {
                    rendered.push('{');
                    rest = &tail[1..];
                }
            }
        }
        rendered.push_str(rest);
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_all_placeholders() {
        let template = PromptTemplate::new("Generate {N} stories in {category}, avoiding {titles}");
        let titles = vec!["Fox and Grapes".to_string(), "The Tortoise and the Hare".to_string()];
        assert_eq!(
            template.render(3, &titles, "Fables"),
            "Generate 3 stories in Fables, avoiding Fox and Grapes，The Tortoise and the Hare"
        );
        assert_eq!(template.render(1, &[], "Myths"), "Generate 1 stories in Myths, avoiding ");
    }

    #[test]
    fn test_placeholders_inside_titles_stay_literal() {
        let template = PromptTemplate::new("{N} for {category}, not {titles} {unknown}");
        let titles = vec!["The {category} Trick".to_string(), "{N} Wishes".to_string()];
        assert_eq!(
            template.render(2, &titles, "Myths"),
            "2 for Myths, not The {category} Trick，{N} Wishes {unknown}"
        );
    }

    #[test]
    fn test_default_template_mentions_every_placeholder() {
        let rendered = PromptTemplate::default().render(5, &["A".to_string()], "Fables");
        assert!(rendered.contains("exactly 5 stories"));
        assert!(rendered.contains("library: A"));
        for placeholder in ["{N}", "{titles}", "{category}"] {
            assert!(!rendered.contains(placeholder));
        }
    }

    #[tokio::test]
    async fn test_missing_file_falls_back() {
        let template = PromptTemplate::load_or_default(Path::new("/nonexistent/prompt.md")).await.unwrap();
        assert_eq!(template, PromptTemplate::default());
    }
}
