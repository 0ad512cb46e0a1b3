//! Mapping registry
//!
//! Resolves an index identity to its [`MappingModel`]: from the in-memory
//! cache when possible, otherwise by introspecting the engine through the
//! read alias. Fresh models are written through to the [`MappingStore`].

mod infer;

pub use infer::infer_model;

use crate::error::{Error, Result};
use crate::model::{IndexIdentity, MappingModel};
use crate::store::{MappingStore, StoreError};
use halyard_es::EngineClient;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of [`MappingRegistry::resolve`]
#[derive(Debug)]
pub struct ResolvedMapping {
    pub model: Arc<MappingModel>,
    /// Served from the cache without touching the engine
    pub from_cache: bool,
    /// Set when the model was learned but could not be persisted
    pub persist_error: Option<StoreError>,
}

pub struct MappingRegistry {
    engine: Arc<dyn EngineClient>,
    store: Arc<dyn MappingStore>,
    cache: RwLock<HashMap<String, Arc<MappingModel>>>,
    /// Serializes load-merge-save against the store
    persist_lock: tokio::sync::Mutex<()>,
}

impl MappingRegistry {
    pub fn new(engine: Arc<dyn EngineClient>, store: Arc<dyn MappingStore>) -> Self {
        Self {
            engine,
            store,
            cache: RwLock::new(HashMap::new()),
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Seed the cache from the store, returning how many models were loaded.
    ///
    /// Entries already cached are kept.
    pub async fn warm(&self) -> Result<usize> {
        let persisted = self.store.load().await?;
        let count = persisted.len();

        let mut cache = self.cache.write();
        for (base_name, model) in persisted {
            cache.entry(base_name).or_insert_with(|| Arc::new(model));
        }

        tracing::info!(indices = count, "Warmed mapping cache from store");
        Ok(count)
    }

    pub async fn resolve(&self, identity: &IndexIdentity) -> Result<ResolvedMapping> {
        if let Some(model) = self.cached(identity) {
            return Ok(ResolvedMapping {
                model,
                from_cache: true,
                persist_error: None,
            });
        }

        let (index, mapping) = self
            .engine
            .get_mapping(&identity.read_alias)
            .await
            .map_err(|source| Error::Resolution {
                index: identity.base_name.clone(),
                source,
            })?;

        let model = Arc::new(infer_model(&index, &mapping));
        tracing::info!(
            base = %identity.base_name,
            index = %index,
            fields = model.len(),
            "Learned mapping"
        );

        self.cache
            .write()
            .insert(identity.base_name.clone(), Arc::clone(&model));

        let persist_error = match self.persist(&identity.base_name, &model).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(
                    base = %identity.base_name,
                    error = %e,
                    "Failed to persist learned mapping"
                );
                Some(e)
            }
        };

        Ok(ResolvedMapping {
            model,
            from_cache: false,
            persist_error,
        })
    }

    /// Cached model, without any I/O
    pub fn cached(&self, identity: &IndexIdentity) -> Option<Arc<MappingModel>> {
        self.cache.read().get(&identity.base_name).cloned()
    }

    /// Drop the model from the cache and the store so the next resolve
    /// introspects again, including after a restart.
    ///
    /// Returns whether a model was dropped from either.
    pub async fn invalidate(
        &self,
        identity: &IndexIdentity,
    ) -> std::result::Result<bool, StoreError> {
        let cached = self.cache.write().remove(&identity.base_name).is_some();

        let _guard = self.persist_lock.lock().await;
        let mut persisted = self.store.load().await?;
        let stored = persisted.remove(&identity.base_name).is_some();
        if stored {
            self.store.save(&persisted).await?;
        }

        if cached || stored {
            tracing::debug!(base = %identity.base_name, cached, stored, "Invalidated mapping");
        }
        Ok(cached || stored)
    }

    /// Addresses of every known field, in order
    pub async fn attributes(&self, identity: &IndexIdentity) -> Result<Vec<String>> {
        let resolved = self.resolve(identity).await?;
        Ok(resolved.model.paths().map(str::to_string).collect())
    }

    async fn persist(
        &self,
        base_name: &str,
        model: &MappingModel,
    ) -> std::result::Result<(), StoreError> {
        let _guard = self.persist_lock.lock().await;

        let mut persisted = self.store.load().await?;
        persisted.insert(base_name.to_string(), model.clone());
        self.store.save(&persisted).await
    }
}
