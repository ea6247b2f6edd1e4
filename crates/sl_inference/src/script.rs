use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sl_core::{ChatMessage, CompletionClient, CompletionRequest, Error, Result};
use tracing::info;

use crate::extract::extract_json_object;

const SCRIPT_SYSTEM_PROMPT: &str = "You write picture-book scripts for young children. \
Answer with one JSON object only: {\"script_cn\": string, \"script_en\": string, \
\"segments\": [{\"page_no\": number, \"text_cn\": string, \"text_en\": string}]}.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptRequest {
    pub theme: String,
    #[serde(default)]
    pub age_range: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub pages: Option<u32>,
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_sampling")]
    pub temperature: f32,
    #[serde(default = "default_sampling")]
    pub top_p: f32,
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_sampling() -> f32 {
    0.7
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptSegment {
    pub page_no: u32,
    #[serde(default)]
    pub text_cn: String,
    #[serde(default)]
    pub text_en: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptDraft {
    #[serde(default)]
    pub script_cn: String,
    #[serde(default)]
    pub script_en: String,
    #[serde(default)]
    pub segments: Vec<ScriptSegment>,
}

pub struct ScriptGenerator {
    client: Arc<dyn CompletionClient>,
}

impl ScriptGenerator {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    fn instruction(request: &ScriptRequest) -> String {
        let mut lines = vec![format!("Theme: {}", request.theme)];
        if let Some(age) = request.age_range.as_deref() {
            lines.push(format!("Reader age: {}", age));
        }
        if let Some(style) = request.style.as_deref() {
            lines.push(format!("Illustration style: {}", style));
        }
        if let Some(pages) = request.pages {
            lines.push(format!("Pages: {}", pages));
        }
        lines.join("\n")
    }

    pub async fn generate(&self, request: &ScriptRequest) -> Result<ScriptDraft> {
        if request.theme.trim().is_empty() {
            return Err(Error::Config("theme is required".to_string()));
        }
        if request.model.trim().is_empty() {
            return Err(Error::Config("model name is required".to_string()));
        }
        info!("🎬 Generating picture-book script for theme {}", request.theme);
        let raw = self.client
            .complete(&CompletionRequest {
                model: request.model.clone(),
                messages: vec![
                    ChatMessage::system(SCRIPT_SYSTEM_PROMPT),
                    ChatMessage::user(Self::instruction(request)),
                ],
                max_tokens: request.max_tokens,
                temperature: request.temperature,
                top_p: request.top_p,
            })
            .await?;

        let object = extract_json_object(&raw)
            .ok_or_else(|| Error::MalformedResponse(format!("script is not a JSON object: {}", raw)))?;
        let draft: ScriptDraft = serde_json::from_value(Value::Object(object))
            .map_err(|e| Error::MalformedResponse(format!("script has unexpected shape: {}", e)))?;
        info!("✨ Script generated with {} pages", draft.segments.len());
        Ok(draft)
    }
}
