//! Service facade
//!
//! [`SearchService`] wires the registry, the synthesizers, the migration
//! engine and the lifecycle helpers around one engine client. Callers name
//! indices by base name; aliases come from the configured
//! [`IdentityDeriver`].

use crate::config::Config;
use crate::error::Result;
use crate::lifecycle::IndexLifecycle;
use crate::migration::{MigrationEngine, MigrationReport, MigrationTarget};
use crate::model::{
    AggregationResult, Document, FacetRequest, IdentityDeriver, IndexIdentity, SearchHit,
    SearchRequest, SearchResults, SuffixIdentityDeriver,
};
use crate::registry::{MappingRegistry, ResolvedMapping};
use crate::store::{FileMappingStore, MappingStore};
use crate::synth::{FacetSynthesizer, QuerySynthesizer};
use halyard_es::mapping::TypeMapping;
use halyard_es::{EngineClient, EsAggregation, EsQuery, EsSearchRequest, HttpEngineClient};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct SearchService {
    engine: Arc<dyn EngineClient>,
    identities: Arc<dyn IdentityDeriver>,
    registry: MappingRegistry,
    queries: QuerySynthesizer,
    facets: FacetSynthesizer,
    migrations: MigrationEngine,
    lifecycle: IndexLifecycle,
}

impl SearchService {
    pub fn new(
        engine: Arc<dyn EngineClient>,
        store: Arc<dyn MappingStore>,
        identities: Arc<dyn IdentityDeriver>,
        config: &Config,
    ) -> Self {
        Self {
            registry: MappingRegistry::new(Arc::clone(&engine), store),
            queries: QuerySynthesizer::new(&config.synthesis),
            facets: FacetSynthesizer::new(),
            migrations: MigrationEngine::new(Arc::clone(&engine), &config.migration),
            lifecycle: IndexLifecycle::new(Arc::clone(&engine)),
            identities,
            engine,
        }
    }

    /// Build the service against the HTTP engine and the file store the
    /// config names
    pub fn from_config(config: &Config) -> Result<Self> {
        let engine = HttpEngineClient::new(config.engine.client_config())?;
        let store = FileMappingStore::new(config.store.path.clone());
        let identities =
            SuffixIdentityDeriver::new(&config.identity.read_suffix, &config.identity.write_suffix)?;

        tracing::info!(
            url = %engine.base_url(),
            store = %config.store.path.display(),
            "Search service configured"
        );

        Ok(Self::new(
            Arc::new(engine),
            Arc::new(store),
            Arc::new(identities),
            config,
        ))
    }

    pub fn registry(&self) -> &MappingRegistry {
        &self.registry
    }

    /// Seed the mapping cache from the store
    pub async fn warm(&self) -> Result<usize> {
        self.registry.warm().await
    }

    pub fn identity(&self, base_name: &str) -> Result<IndexIdentity> {
        self.identities.derive(base_name)
    }

    pub async fn resolve_mapping(&self, identity: &IndexIdentity) -> Result<ResolvedMapping> {
        self.registry.resolve(identity).await
    }

    pub async fn build_query(&self, request: &SearchRequest) -> Result<EsSearchRequest> {
        let resolved = self.registry.resolve(&request.index).await?;
        self.queries.build_query(request, &resolved.model)
    }

    /// Run a search through the read alias and return one page of hits
    pub async fn execute_search(&self, request: &SearchRequest) -> Result<SearchResults> {
        let body = self.build_query(request).await?;
        let response = self.engine.search(&request.index.read_alias, &body).await?;

        let total = response
            .hits
            .total
            .map(|t| t.value)
            .unwrap_or(response.hits.hits.len() as u64);
        let returned = response.hits.hits.len();
        let end = request.cursor.saturating_add(returned);
        let next_cursor = (returned > 0 && (end as u64) < total).then_some(end);

        Ok(SearchResults {
            total,
            hits: response
                .hits
                .hits
                .into_iter()
                .map(|hit| SearchHit {
                    id: hit.id,
                    score: hit.score,
                    source: hit.source,
                })
                .collect(),
            next_cursor,
        })
    }

    pub async fn build_aggregations(
        &self,
        identity: &IndexIdentity,
        request: &FacetRequest,
    ) -> Result<BTreeMap<String, EsAggregation>> {
        let resolved = self.registry.resolve(identity).await?;
        Ok(self.facets.build_aggregations(request, &resolved.model))
    }

    /// Collect facet buckets over the whole index
    pub async fn execute_facets(
        &self,
        identity: &IndexIdentity,
        request: &FacetRequest,
    ) -> Result<AggregationResult> {
        let resolved = self.registry.resolve(identity).await?;
        let aggs = self.facets.build_aggregations(request, &resolved.model);
        if aggs.is_empty() {
            return Ok(AggregationResult::default());
        }

        let mut body = EsSearchRequest::new(EsQuery::match_all());
        body.size = Some(0);
        body.aggs = aggs;

        let response = self.engine.search(&identity.read_alias, &body).await?;
        self.facets
            .parse_aggregations(&response.aggregations, request, &resolved.model)
    }

    /// Move the index to a new mapping. The cached and persisted model are
    /// dropped only once the migration has completed.
    pub async fn migrate_mapping(
        &self,
        identity: &IndexIdentity,
        target: MigrationTarget,
        cancel: &CancellationToken,
    ) -> Result<MigrationReport> {
        let report = self.migrations.migrate(identity, target, cancel).await?;
        if let Err(e) = self.registry.invalidate(identity).await {
            tracing::warn!(
                base = %identity.base_name,
                error = %e,
                "Failed to drop persisted mapping after migration"
            );
        }
        Ok(report)
    }

    pub async fn create_index(
        &self,
        identity: &IndexIdentity,
        mapping: Option<TypeMapping>,
    ) -> Result<()> {
        self.lifecycle.create_index(identity, mapping).await
    }

    pub async fn index_documents(
        &self,
        identity: &IndexIdentity,
        documents: &[Document],
    ) -> Result<Vec<String>> {
        self.lifecycle.index_documents(identity, documents).await
    }

    pub async fn update_settings(&self, identity: &IndexIdentity, settings: &Value) -> Result<()> {
        self.lifecycle.update_settings(identity, settings).await
    }

    pub async fn list_attributes(&self, identity: &IndexIdentity) -> Result<Vec<String>> {
        self.registry.attributes(identity).await
    }
}
