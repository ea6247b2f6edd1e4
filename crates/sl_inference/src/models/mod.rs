use std::sync::Arc;
use sl_core::{CompletionClient, Error, Result};
use crate::Config;

pub mod chat;
pub mod scripted;

pub use chat::ChatCompletionClient;
pub use scripted::ScriptedClient;

/// Hands out a completion client, optionally for a caller-supplied API key.
pub trait ClientProvider: Send + Sync {
    fn client_for(&self, api_key: Option<&str>) -> Result<Arc<dyn CompletionClient>>;
}

/// Builds HTTP clients from the process configuration.
#[derive(Debug, Clone)]
pub struct HttpClientProvider {
    config: Config,
}

impl HttpClientProvider {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ClientProvider for HttpClientProvider {
    fn client_for(&self, api_key: Option<&str>) -> Result<Arc<dyn CompletionClient>> {
        let key = api_key
            .filter(|k| !k.trim().is_empty())
            .map(str::to_string)
            .or_else(|| self.config.api_key.clone())
            .ok_or_else(|| Error::Config("API key is not configured".to_string()))?;
        Ok(Arc::new(ChatCompletionClient::new(key, &self.config.base_url, self.config.timeout)?))
    }
}

/// Always returns the same client; used for tests and offline runs.
#[derive(Debug, Clone)]
pub struct StaticProvider(pub Arc<dyn CompletionClient>);

impl ClientProvider for StaticProvider {
    fn client_for(&self, _api_key: Option<&str>) -> Result<Arc<dyn CompletionClient>> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_key_overrides_config() {
        let provider = HttpClientProvider::new(Config::default());
        assert!(matches!(provider.client_for(None), Err(Error::Config(_))));
        assert!(matches!(provider.client_for(Some("   ")), Err(Error::Config(_))));
        assert!(provider.client_for(Some("sk-request")).is_ok());

        let provider = HttpClientProvider::new(Config { api_key: Some("sk-config".to_string()), ..Config::default() });
        assert!(provider.client_for(None).is_ok());
    }

    #[test]
    fn test_static_provider_ignores_key() {
        let client: Arc<dyn CompletionClient> = Arc::new(ScriptedClient::new(["[]"]));
        let provider = StaticProvider(client);
        assert_eq!(provider.client_for(Some("ignored")).unwrap().name(), "Scripted");
    }
}
