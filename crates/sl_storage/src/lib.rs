use sl_core::{Error, Result, Storage};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

pub mod backends;

pub use backends::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    #[default]
    Memory,
    SQLite,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::SQLite),
            other => Err(Error::Config(format!("Unknown storage backend: {}", other))),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::SQLite => write!(f, "sqlite"),
        }
    }
}

/// Build the configured backend. `db_path` is only used by SQLite.
pub async fn create_storage(kind: StorageKind, db_path: &Path) -> Result<Arc<dyn Storage>> {
    info!("📦 Opening {} storage", kind);
    match kind {
        StorageKind::Memory => Ok(Arc::new(InMemoryStorage::new())),
        #[cfg(feature = "sqlite")]
        StorageKind::SQLite => Ok(Arc::new(SQLiteStorage::new_with_path(db_path).await?)),
        #[cfg(not(feature = "sqlite"))]
        StorageKind::SQLite => Err(Error::Config(format!(
            "SQLite support is not compiled in (database {})",
            db_path.display()
        ))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, StorageKind};
}
