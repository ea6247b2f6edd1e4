use serde_json::{Map, Value};
use sl_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Free-form JSON settings document kept in one file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file reads as an empty document.
    pub async fn load(&self) -> Result<Value> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Value::Object(Map::new())),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, settings: &Value) -> Result<()> {
        if !settings.is_object() {
            return Err(Error::Config("settings must be a JSON object".to_string()));
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_string_pretty(settings)?).await?;
        info!("💾 Settings saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_file_is_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        assert_eq!(store.load().await.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("data").join("settings.json"));
        store.save(&json!({"theme": "dark", "名称": "故事"})).await.unwrap();
        assert_eq!(store.load().await.unwrap(), json!({"theme": "dark", "名称": "故事"}));

        let err = store.save(&json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
