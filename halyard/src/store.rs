//! Durable storage for learned mappings
//!
//! The registry persists every resolved [`MappingModel`] so a restarted
//! process can answer from disk before the engine is reachable. Stores hold
//! one map keyed by index base name and are always read and written whole.

use crate::model::MappingModel;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Persisted models keyed by index base name
pub type PersistedMappings = BTreeMap<String, MappingModel>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Key-value persistence for mapping models
#[async_trait]
pub trait MappingStore: Send + Sync {
    async fn load(&self) -> Result<PersistedMappings, StoreError>;

    async fn save(&self, mappings: &PersistedMappings) -> Result<(), StoreError>;
}

/// Pretty-printed JSON file.
///
/// A missing file loads as empty. Content that does not parse is copied to
/// `<file>.backup` and the store starts over empty.
pub struct FileMappingStore {
    path: PathBuf,
}

impl FileMappingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.sibling(".backup")
    }
}

#[async_trait]
impl MappingStore for FileMappingStore {
    async fn load(&self) -> Result<PersistedMappings, StoreError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(PersistedMappings::new())
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        if content.trim().is_empty() {
            return Ok(PersistedMappings::new());
        }

        match serde_json::from_str(&content) {
            Ok(mappings) => Ok(mappings),
            Err(e) => {
                let backup = self.backup_path();
                tracing::warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "Mapping store is corrupt, starting empty"
                );
                fs::copy(&self.path, &backup)
                    .await
                    .map_err(|e| StoreError::io(&backup, e))?;
                Ok(PersistedMappings::new())
            }
        }
    }

    async fn save(&self, mappings: &PersistedMappings) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(mappings)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }

        let tmp = self.sibling(".tmp");
        fs::write(&tmp, content)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), indices = mappings.len(), "Saved mappings");
        Ok(())
    }
}

/// In-process store
#[derive(Default)]
pub struct MemoryMappingStore {
    mappings: Mutex<PersistedMappings>,
}

impl MemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mappings(mappings: PersistedMappings) -> Self {
        Self {
            mappings: Mutex::new(mappings),
        }
    }

    pub fn snapshot(&self) -> PersistedMappings {
        self.mappings.lock().clone()
    }
}

#[async_trait]
impl MappingStore for MemoryMappingStore {
    async fn load(&self) -> Result<PersistedMappings, StoreError> {
        Ok(self.mappings.lock().clone())
    }

    async fn save(&self, mappings: &PersistedMappings) -> Result<(), StoreError> {
        *self.mappings.lock() = mappings.clone();
        Ok(())
    }
}
