//! AI story collection.
//!
//! A run asks the model for the stories still missing, keeps the well-formed
//! ones that are new to the category, and repeats until the target is met or
//! the attempt budget runs out. Every accepted story is written to storage
//! before it is counted, so a failure mid-run keeps what was already saved.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use sl_core::types::{NewStory, StoryDraft, StoryRecord, COLLECTOR_SOURCE, UNCATEGORIZED};
use sl_core::{ChatMessage, CompletionClient, CompletionRequest, Error, Result, StoryStorage};
use tracing::{debug, info, warn};

use crate::extract::extract_json_array;
use crate::prompt::PromptTemplate;

/// Upper bound on stories requested per run.
pub const MAX_TARGET_COUNT: usize = 100;
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
/// Collection responses are long; smaller budgets get raised to this.
pub const MIN_COLLECT_MAX_TOKENS: u32 = 8192;

#[derive(Debug, Clone, PartialEq)]
pub struct CollectRequest {
    pub category: Option<String>,
    pub target_count: usize,
    pub model: String,
    pub user_instruction: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub batch: Option<String>,
    pub max_attempts: usize,
    /// Return the first raw completion without parsing or saving anything.
    pub test: bool,
}

impl CollectRequest {
    pub fn new(category: impl Into<String>, target_count: usize, model: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            target_count,
            model: model.into(),
            user_instruction: None,
            max_tokens: 4096,
            temperature: 0.7,
            top_p: 0.7,
            batch: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            test: false,
        }
    }

    pub fn category(&self) -> String {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNCATEGORIZED)
            .to_string()
    }

    pub fn target(&self) -> usize {
        self.target_count.clamp(1, MAX_TARGET_COUNT)
    }
}

/// First user message of a chat transcript, used as the collection instruction.
pub fn first_user_instruction(messages: &[ChatMessage]) -> Option<String> {
    messages
        .iter()
        .find(|m| m.role == "user")
        .map(|m| m.content.clone())
        .filter(|c| !c.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectionStop {
    /// Target reached.
    Fulfilled,
    /// Attempt budget spent before reaching the target.
    AttemptsExhausted,
    /// The model's answer held no JSON array.
    Malformed { raw: String },
    /// The model explicitly returned `[]`.
    Empty,
    /// Test mode: the raw answer, unparsed.
    Test { raw: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionOutcome {
    pub category: String,
    pub target_count: usize,
    pub collected: Vec<StoryRecord>,
    pub duplicate_titles: Vec<String>,
    pub skipped_mismatch: usize,
    pub attempts_used: usize,
    pub met: bool,
    pub stop: CollectionStop,
}

impl CollectionOutcome {
    pub fn saved_titles(&self) -> Vec<String> {
        self.collected.iter().map(|s| s.title.clone()).collect()
    }
}

#[derive(Debug, Default)]
struct CollectionState {
    collected: Vec<StoryRecord>,
    collected_titles: HashSet<String>,
    tried_titles: HashSet<String>,
    duplicate_titles: Vec<String>,
    existing_titles: HashSet<String>,
    /// `existing_titles` in the order shown to the model.
    existing_order: Vec<String>,
    skipped_mismatch: usize,
}

impl CollectionState {
    fn seed(titles: Vec<String>) -> Self {
        let mut state = Self::default();
        for title in titles {
            if state.existing_titles.insert(title.clone()) {
                state.existing_order.push(title);
            }
        }
        state
    }

    fn mark_duplicate(&mut self, title: String) {
        self.tried_titles.insert(title.clone());
        if !self.duplicate_titles.contains(&title) {
            self.duplicate_titles.push(title);
        }
    }

    fn accept(&mut self, record: StoryRecord) {
        self.tried_titles.insert(record.title.clone());
        self.collected_titles.insert(record.title.clone());
        if self.existing_titles.insert(record.title.clone()) {
            self.existing_order.push(record.title.clone());
        }
        self.collected.push(record);
    }
}

pub struct StoryCollector<S: StoryStorage + ?Sized> {
    client: Arc<dyn CompletionClient>,
    storage: Arc<S>,
    template: PromptTemplate,
}

impl<S: StoryStorage + ?Sized> fmt::Debug for StoryCollector<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoryCollector")
            .field("client", &self.client)
            .field("storage", &"<dyn StoryStorage>")
            .finish()
    }
}

impl<S: StoryStorage + ?Sized> StoryCollector<S> {
    pub fn new(client: Arc<dyn CompletionClient>, storage: Arc<S>, template: PromptTemplate) -> Self {
        Self { client, storage, template }
    }

    pub async fn collect(&self, request: &CollectRequest) -> Result<CollectionOutcome> {
        if request.model.trim().is_empty() {
            return Err(Error::Config("model name is required".to_string()));
        }
        let category = request.category();
        let target = request.target();
        let max_tokens = request.max_tokens.max(MIN_COLLECT_MAX_TOKENS);

        let mut state = CollectionState::seed(self.storage.find_titles_by_category(&category).await?);
        info!(
            "📚 Collecting {} stories for {} ({} already stored)",
            target,
            category,
            state.existing_order.len()
        );

        let mut attempt = 0;
        let mut stop = None;
        while state.collected.len() < target && attempt < request.max_attempts {
            let need = target - state.collected.len();
            info!("🔁 Attempt {} - {} stories still needed", attempt + 1, need);

            let mut messages = vec![ChatMessage::system(self.template.render(
                need,
                &state.existing_order,
                &category,
            ))];
            if let Some(instruction) = request.user_instruction.as_deref().filter(|i| !i.trim().is_empty()) {
                messages.push(ChatMessage::user(instruction));
            }
            let completion = CompletionRequest {
                model: request.model.clone(),
                messages,
                max_tokens,
                temperature: request.temperature,
                top_p: request.top_p,
            };

            let raw = self.client.complete(&completion).await?;
            attempt += 1;
            debug!("Model response: {}", raw);

            if request.test {
                stop = Some(CollectionStop::Test { raw });
                break;
            }

            let Some(candidates) = extract_json_array(&raw) else {
                warn!("Model response is not a JSON array, stopping");
                stop = Some(CollectionStop::Malformed { raw });
                break;
            };
            if candidates.is_empty() {
                warn!("Model returned no stories, stopping");
                stop = Some(CollectionStop::Empty);
                break;
            }
            info!("📝 Parsed {} candidate stories", candidates.len());

            for candidate in candidates {
                match serde_json::from_value::<StoryDraft>(candidate) {
                    Ok(draft) => self.consider(draft, &category, request, &mut state).await?,
                    Err(e) => warn!("Skipping malformed story object: {}", e),
                }
            }
        }

        let met = state.collected.len() >= target;
        let stop = stop.unwrap_or(if met {
            CollectionStop::Fulfilled
        } else {
            CollectionStop::AttemptsExhausted
        });
        info!(
            "✨ Collection finished - saved {}, duplicates {}, attempts {}",
            state.collected.len(),
            state.duplicate_titles.len(),
            attempt
        );

        Ok(CollectionOutcome {
            category,
            target_count: target,
            collected: state.collected,
            duplicate_titles: state.duplicate_titles,
            skipped_mismatch: state.skipped_mismatch,
            attempts_used: attempt,
            met,
            stop,
        })
    }

    async fn consider(
        &self,
        draft: StoryDraft,
        category: &str,
        request: &CollectRequest,
        state: &mut CollectionState,
    ) -> Result<()> {
        if draft.category != category {
            warn!("Category mismatch for {} ({} instead of {})", draft.title, draft.category, category);
            state.skipped_mismatch += 1;
            return Ok(());
        }
        if draft.title.is_empty() || draft.summary.is_empty() {
            warn!("Story is missing a title or summary: {:?}", draft);
            return Ok(());
        }
        if state.collected_titles.contains(&draft.title) {
            debug!("Already saved {} in this run", draft.title);
            return Ok(());
        }
        if state.tried_titles.contains(&draft.title) || state.existing_titles.contains(&draft.title) {
            info!("♻️ Duplicate title: {}", draft.title);
            state.mark_duplicate(draft.title);
            return Ok(());
        }
        if self.storage.exists_by_title_or_content(category, &draft.title, &draft.summary).await? {
            info!("♻️ Already stored: {}", draft.title);
            state.mark_duplicate(draft.title);
            return Ok(());
        }

        let record = self.storage
            .insert_story(NewStory {
                title: draft.title,
                content: draft.summary,
                category: category.to_string(),
                source: COLLECTOR_SOURCE.to_string(),
                batch: request.batch.clone(),
            })
            .await?;
        info!("💾 Saved story: {}", record.title);
        state.accept(record);
        Ok(())
    }
}
