use std::sync::Arc;

use sl_core::Storage;
use sl_inference::models::ClientProvider;
use sl_inference::prompt::PromptTemplate;

use crate::settings::SettingsStore;

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub clients: Arc<dyn ClientProvider>,
    pub template: PromptTemplate,
    /// Used when a request names no model.
    pub default_model: Option<String>,
    pub settings: SettingsStore,
}
