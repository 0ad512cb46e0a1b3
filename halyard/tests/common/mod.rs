//! In-memory engine and store doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use halyard::store::{MappingStore, PersistedMappings, StoreError};
use halyard::{Config, IndexIdentity, SearchService, SuffixIdentityDeriver};
use halyard_es::admin::{AliasAction, CreateIndexRequest, ReindexRequest, ReindexResponse, UpdateAliasesRequest};
use halyard_es::mapping::TypeMapping;
use halyard_es::response::{EsHit, EsHits, EsTotal};
use halyard_es::{EngineClient, EngineError, EsSearchRequest, EsSearchResponse};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How an injected fault plays out
#[derive(Clone)]
pub enum Fault {
    /// Answer with an engine status error
    Status(u16, &'static str),
    /// Like `Status`, but only on the nth call (from 1) of the operation
    StatusOnCall(usize, u16, &'static str),
    /// Cancel the token, then never answer
    CancelAndHang(CancellationToken),
    /// Apply the operation, then report a timeout as if the answer was lost
    TimeoutAfterApply,
    /// Apply the operation, then cancel the token
    CancelAfterApply(CancellationToken),
}

#[derive(Default)]
struct FakeIndex {
    mapping: TypeMapping,
    settings: Value,
    documents: BTreeMap<String, Value>,
}

#[derive(Default)]
struct State {
    indices: BTreeMap<String, FakeIndex>,
    aliases: BTreeMap<String, BTreeSet<String>>,
    faults: HashMap<&'static str, Fault>,
    calls: Vec<String>,
    searches: Vec<(String, EsSearchRequest)>,
    search_response: Option<EsSearchResponse>,
    reindex_failures: Vec<Value>,
    next_id: u64,
}

/// Engine double: indices, aliases and documents in memory, with per
/// operation fault injection and a call log
#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<State>,
}

fn status(operation: &'static str, code: u16, error_type: &str, reason: impl Into<String>) -> EngineError {
    EngineError::Status {
        operation,
        status: code,
        error_type: error_type.to_string(),
        reason: reason.into(),
    }
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create `index` with `mapping` and bind the given aliases to it
    pub fn seed_index(&self, index: &str, mapping: Value, aliases: &[&str]) {
        let mapping: TypeMapping = serde_json::from_value(mapping).unwrap();
        let mut state = self.state.lock();
        state.indices.insert(
            index.to_string(),
            FakeIndex {
                mapping,
                ..Default::default()
            },
        );
        for alias in aliases {
            state
                .aliases
                .entry(alias.to_string())
                .or_default()
                .insert(index.to_string());
        }
    }

    pub fn seed_document(&self, index: &str, id: &str, source: Value) {
        let mut state = self.state.lock();
        state
            .indices
            .get_mut(index)
            .unwrap()
            .documents
            .insert(id.to_string(), source);
    }

    pub fn bind_alias(&self, alias: &str, index: &str) {
        self.state
            .lock()
            .aliases
            .entry(alias.to_string())
            .or_default()
            .insert(index.to_string());
    }

    pub fn inject(&self, operation: &'static str, fault: Fault) {
        self.state.lock().faults.insert(operation, fault);
    }

    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }

    pub fn set_search_response(&self, response: Value) {
        self.state.lock().search_response = Some(serde_json::from_value(response).unwrap());
    }

    pub fn set_reindex_failures(&self, failures: Vec<Value>) {
        self.state.lock().reindex_failures = failures;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn count_calls(&self, operation: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.as_str() == operation)
            .count()
    }

    pub fn searches(&self) -> Vec<(String, EsSearchRequest)> {
        self.state.lock().searches.clone()
    }

    pub fn has_index(&self, index: &str) -> bool {
        self.state.lock().indices.contains_key(index)
    }

    pub fn mapping_of(&self, index: &str) -> TypeMapping {
        self.state.lock().indices[index].mapping.clone()
    }

    pub fn settings_of(&self, index: &str) -> Value {
        self.state.lock().indices[index].settings.clone()
    }

    pub fn documents_of(&self, index: &str) -> BTreeMap<String, Value> {
        self.state.lock().indices[index].documents.clone()
    }

    pub fn alias_targets(&self, alias: &str) -> Vec<String> {
        self.state
            .lock()
            .aliases
            .get(alias)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn apply_create_index(&self, index: &str, body: &CreateIndexRequest) -> halyard_es::Result<()> {
        let mut state = self.state.lock();
        if state.indices.contains_key(index) {
            return Err(status(
                "create_index",
                400,
                "resource_already_exists_exception",
                format!("index [{index}] already exists"),
            ));
        }
        state.indices.insert(
            index.to_string(),
            FakeIndex {
                mapping: body.mappings.clone().unwrap_or_default(),
                settings: body.settings.clone().unwrap_or_else(|| json!({})),
                documents: BTreeMap::new(),
            },
        );
        for alias in body.aliases.keys() {
            state
                .aliases
                .entry(alias.clone())
                .or_default()
                .insert(index.to_string());
        }
        Ok(())
    }

    fn apply_update_aliases(&self, request: &UpdateAliasesRequest) -> halyard_es::Result<()> {
        let mut state = self.state.lock();

        // All or nothing, like the engine
        let mut aliases = state.aliases.clone();
        for action in &request.actions {
            let target = action.target();
            if !state.indices.contains_key(&target.index) {
                return Err(status(
                    "update_aliases",
                    404,
                    "index_not_found_exception",
                    format!("no such index [{}]", target.index),
                ));
            }
            match action {
                AliasAction::Add(_) => {
                    aliases
                        .entry(target.alias.clone())
                        .or_default()
                        .insert(target.index.clone());
                }
                AliasAction::Remove(_) => {
                    let removed = aliases
                        .get_mut(&target.alias)
                        .map(|set| set.remove(&target.index))
                        .unwrap_or(false);
                    if !removed {
                        return Err(status(
                            "update_aliases",
                            404,
                            "aliases_not_found_exception",
                            format!("aliases [{}] missing", target.alias),
                        ));
                    }
                }
            }
        }
        aliases.retain(|_, set| !set.is_empty());
        state.aliases = aliases;
        Ok(())
    }

    /// Log the call and hand back any fault that applies to it
    fn enter(&self, operation: &'static str) -> Option<Fault> {
        let mut state = self.state.lock();
        state.calls.push(operation.to_string());
        let nth = state.calls.iter().filter(|c| c.as_str() == operation).count();
        match state.faults.get(operation) {
            Some(Fault::StatusOnCall(on, ..)) if *on != nth => None,
            fault => fault.cloned(),
        }
    }

    async fn check(&self, operation: &'static str) -> halyard_es::Result<()> {
        match self.enter(operation) {
            None => Ok(()),
            Some(Fault::Status(code, error_type) | Fault::StatusOnCall(_, code, error_type)) => {
                Err(status(operation, code, error_type, "injected fault"))
            }
            Some(Fault::CancelAndHang(token)) => {
                token.cancel();
                std::future::pending::<()>().await;
                Ok(())
            }
            Some(Fault::TimeoutAfterApply | Fault::CancelAfterApply(_)) => Ok(()),
        }
    }

    /// Play out faults that strike once the operation has been applied
    fn settle<T>(
        &self,
        operation: &'static str,
        result: halyard_es::Result<T>,
    ) -> halyard_es::Result<T> {
        let fault = self.state.lock().faults.get(operation).cloned();
        match (fault, result) {
            (Some(Fault::TimeoutAfterApply), Ok(_)) => Err(EngineError::Timeout { operation }),
            (Some(Fault::CancelAfterApply(token)), result) => {
                token.cancel();
                result
            }
            (_, result) => result,
        }
    }
}

impl State {
    /// Concrete indices `target` names, whether an index or an alias
    fn resolve(&self, operation: &'static str, target: &str) -> halyard_es::Result<Vec<String>> {
        if self.indices.contains_key(target) {
            return Ok(vec![target.to_string()]);
        }
        match self.aliases.get(target) {
            Some(bound) if !bound.is_empty() => Ok(bound.iter().cloned().collect()),
            _ => Err(status(
                operation,
                404,
                "index_not_found_exception",
                format!("no such index [{target}]"),
            )),
        }
    }

    fn resolve_one(&self, operation: &'static str, target: &str) -> halyard_es::Result<String> {
        let mut indices = self.resolve(operation, target)?;
        if indices.len() != 1 {
            return Err(status(
                operation,
                400,
                "illegal_argument_exception",
                format!("alias [{target}] has more than one index associated with it"),
            ));
        }
        Ok(indices.remove(0))
    }
}

#[async_trait]
impl EngineClient for FakeEngine {
    async fn create_index(&self, index: &str, body: &CreateIndexRequest) -> halyard_es::Result<()> {
        self.check("create_index").await?;
        let result = self.apply_create_index(index, body);
        self.settle("create_index", result)
    }

    async fn put_settings(&self, index: &str, settings: &Value) -> halyard_es::Result<()> {
        self.check("put_settings").await?;
        let mut state = self.state.lock();
        for name in state.resolve("put_settings", index)? {
            let entry = state.indices.get_mut(&name).unwrap();
            if !entry.settings.is_object() {
                entry.settings = json!({});
            }
            if let (Some(target), Some(source)) = (entry.settings.as_object_mut(), settings.as_object()) {
                for (key, value) in source {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    async fn get_mapping(&self, target: &str) -> halyard_es::Result<(String, TypeMapping)> {
        self.check("get_mapping").await?;
        let state = self.state.lock();
        let index = state.resolve_one("get_mapping", target)?;
        let mapping = state.indices[&index].mapping.clone();
        Ok((index, mapping))
    }

    async fn get_alias(&self, alias: &str) -> halyard_es::Result<Vec<String>> {
        self.check("get_alias").await?;
        Ok(self.alias_targets(alias))
    }

    async fn update_aliases(&self, request: &UpdateAliasesRequest) -> halyard_es::Result<()> {
        self.check("update_aliases").await?;
        let result = self.apply_update_aliases(request);
        self.settle("update_aliases", result)
    }

    async fn index_document(
        &self,
        target: &str,
        id: Option<&str>,
        document: &Value,
        _refresh: bool,
    ) -> halyard_es::Result<String> {
        self.check("index_document").await?;
        let mut state = self.state.lock();
        let index = state.resolve_one("index_document", target)?;
        let id = match id {
            Some(id) => id.to_string(),
            None => {
                state.next_id += 1;
                format!("auto-{}", state.next_id)
            }
        };
        state
            .indices
            .get_mut(&index)
            .unwrap()
            .documents
            .insert(id.clone(), document.clone());
        Ok(id)
    }

    async fn reindex(&self, request: &ReindexRequest) -> halyard_es::Result<ReindexResponse> {
        self.check("reindex").await?;
        let mut state = self.state.lock();
        let source = state.resolve_one("reindex", &request.source.index)?;
        let dest = state.resolve_one("reindex", &request.dest.index)?;

        let documents = state.indices[&source].documents.clone();
        let total = documents.len() as u64;
        let mut created = 0;
        let mut updated = 0;
        let dest_index = state.indices.get_mut(&dest).unwrap();
        for (id, source) in documents {
            if dest_index.documents.insert(id, source).is_some() {
                updated += 1;
            } else {
                created += 1;
            }
        }

        Ok(ReindexResponse {
            took: 7,
            timed_out: false,
            total,
            created,
            updated,
            failures: state.reindex_failures.clone(),
        })
    }

    async fn search(&self, target: &str, request: &EsSearchRequest) -> halyard_es::Result<EsSearchResponse> {
        self.check("search").await?;
        let mut state = self.state.lock();
        state.searches.push((target.to_string(), request.clone()));
        if let Some(response) = state.search_response.clone() {
            return Ok(response);
        }

        // No query evaluation: every document of the target matches
        let mut hits = Vec::new();
        for index in state.resolve("search", target)? {
            for (id, source) in &state.indices[&index].documents {
                hits.push(EsHit {
                    index: index.clone(),
                    id: id.clone(),
                    score: Some(1.0),
                    source: source.clone(),
                });
            }
        }
        let total = hits.len() as u64;
        let from = request.from.unwrap_or(0);
        let size = request.size.unwrap_or(10);
        let page = hits.into_iter().skip(from).take(size).collect();

        Ok(EsSearchResponse {
            took: 1,
            timed_out: false,
            hits: EsHits {
                total: Some(EsTotal {
                    value: total,
                    relation: "eq".to_string(),
                }),
                max_score: Some(1.0),
                hits: page,
            },
            aggregations: BTreeMap::new(),
        })
    }
}

/// Store that loads empty and refuses every save
pub struct FailingStore;

#[async_trait]
impl MappingStore for FailingStore {
    async fn load(&self) -> Result<PersistedMappings, StoreError> {
        Ok(PersistedMappings::new())
    }

    async fn save(&self, _mappings: &PersistedMappings) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }
}

pub fn identity(base: &str) -> IndexIdentity {
    use halyard::IdentityDeriver;
    SuffixIdentityDeriver::default().derive(base).unwrap()
}

/// `products`: a full-text title with a keyword sub-field, a keyword
/// color, a long price and nested variants
pub fn products_mapping() -> Value {
    json!({
        "properties": {
            "title": {
                "type": "text",
                "fields": {"keyword": {"type": "keyword", "ignore_above": 256}}
            },
            "description": {"type": "text"},
            "color": {"type": "keyword"},
            "price": {"type": "long"},
            "variants": {
                "type": "nested",
                "properties": {
                    "size": {"type": "keyword"},
                    "stock": {"type": "integer"}
                }
            }
        }
    })
}

/// Engine holding `products` behind its read and write aliases
pub fn products_engine() -> Arc<FakeEngine> {
    let engine = FakeEngine::new();
    engine.seed_index("products", products_mapping(), &["products-read", "products-write"]);
    engine
}

pub fn service_with(engine: Arc<FakeEngine>, store: Arc<dyn MappingStore>) -> SearchService {
    SearchService::new(
        engine,
        store,
        Arc::new(SuffixIdentityDeriver::default()),
        &Config::default(),
    )
}
