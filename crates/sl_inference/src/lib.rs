use sl_core::{Error, Result};
use std::time::Duration;

pub mod collector;
pub mod extract;
pub mod models;
pub mod prompt;
pub mod script;

pub const DEFAULT_BASE_URL: &str = "https://api.siliconflow.cn/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    /// Reject base URLs that reqwest would only fail on at request time.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("Invalid base URL {}: {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!("Unsupported base URL scheme: {}", url.scheme())));
        }
        Ok(())
    }
}

pub mod prelude {
    pub use super::Config;
    pub use super::collector::{CollectRequest, CollectionOutcome, CollectionStop, StoryCollector};
    pub use super::models::{ClientProvider, HttpClientProvider, StaticProvider};
    pub use super::prompt::PromptTemplate;
    pub use super::script::{ScriptDraft, ScriptGenerator, ScriptRequest};
    pub use sl_core::{ChatMessage, CompletionClient, Error, Result};
}
