//! Mapping registry: resolution, caching and persistence

mod common;

use common::{identity, products_engine, FailingStore, FakeEngine, Fault};
use halyard::store::PersistedMappings;
use halyard::{Error, MappingRegistry, MappingStore, MemoryMappingStore};
use halyard_es::FieldType;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_resolve_learns_flat_model() {
    let engine = products_engine();
    let registry = MappingRegistry::new(engine.clone(), Arc::new(MemoryMappingStore::new()));

    let resolved = registry.resolve(&identity("products")).await.unwrap();
    let model = &resolved.model;

    assert!(!resolved.from_cache);
    assert!(resolved.persist_error.is_none());
    assert_eq!(model.index, "products");
    assert_eq!(
        model.paths().collect::<Vec<_>>(),
        vec!["color", "description", "price", "title", "variants.size", "variants.stock"]
    );

    let title = model.get("title").unwrap();
    assert_eq!(title.data_types, vec![FieldType::Text, FieldType::Keyword]);
    assert_eq!(title.exact_subfield.as_deref(), Some("keyword"));

    let size = model.get("variants.size").unwrap();
    assert!(size.is_nested);
    assert_eq!(size.nested_paths, vec!["variants"]);
}

#[tokio::test]
async fn test_resolve_is_idempotent() {
    let engine = products_engine();
    let registry = MappingRegistry::new(engine.clone(), Arc::new(MemoryMappingStore::new()));
    let products = identity("products");

    let first = registry.resolve(&products).await.unwrap();
    let second = registry.resolve(&products).await.unwrap();

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(*first.model, *second.model);
    assert_eq!(engine.count_calls("get_mapping"), 1);
}

#[tokio::test]
async fn test_resolve_goes_through_read_alias() {
    let engine = FakeEngine::new();
    engine.seed_index(
        "orders-000003",
        json!({"properties": {"status": {"type": "keyword"}}}),
        &["orders-read", "orders-write"],
    );
    let registry = MappingRegistry::new(engine.clone(), Arc::new(MemoryMappingStore::new()));

    let resolved = registry.resolve(&identity("orders")).await.unwrap();
    assert_eq!(resolved.model.index, "orders-000003");
}

#[tokio::test]
async fn test_missing_index_is_resolution_error() {
    let engine = FakeEngine::new();
    let registry = MappingRegistry::new(engine, Arc::new(MemoryMappingStore::new()));

    let err = registry.resolve(&identity("ghost")).await.unwrap_err();
    match err {
        Error::Resolution { index, source } => {
            assert_eq!(index, "ghost");
            assert!(source.is_not_found());
        }
        other => panic!("expected resolution error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_engine_failure_is_not_cached() {
    let engine = products_engine();
    let registry = MappingRegistry::new(engine.clone(), Arc::new(MemoryMappingStore::new()));
    let products = identity("products");

    engine.inject("get_mapping", Fault::Status(503, "unavailable_shards_exception"));
    let err = registry.resolve(&products).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(registry.cached(&products).is_none());

    engine.clear_faults();
    assert!(registry.resolve(&products).await.is_ok());
}

#[tokio::test]
async fn test_persist_failure_still_serves_model() {
    let engine = products_engine();
    let registry = MappingRegistry::new(engine, Arc::new(FailingStore));
    let products = identity("products");

    let resolved = registry.resolve(&products).await.unwrap();
    assert!(resolved.persist_error.is_some());
    assert!(resolved.model.contains("title"));

    // Served from memory despite the failed write
    let again = registry.resolve(&products).await.unwrap();
    assert!(again.from_cache);
}

#[tokio::test]
async fn test_learned_models_are_merged_into_store() {
    let engine = products_engine();
    engine.seed_index(
        "orders",
        json!({"properties": {"status": {"type": "keyword"}}}),
        &["orders-read", "orders-write"],
    );
    let store = Arc::new(MemoryMappingStore::new());
    let registry = MappingRegistry::new(engine, store.clone());

    registry.resolve(&identity("products")).await.unwrap();
    registry.resolve(&identity("orders")).await.unwrap();

    let persisted = store.snapshot();
    assert_eq!(persisted.keys().collect::<Vec<_>>(), vec!["orders", "products"]);
    assert!(persisted["orders"].contains("status"));
}

#[tokio::test]
async fn test_warm_serves_without_engine() {
    let seeding = products_engine();
    let store = Arc::new(MemoryMappingStore::new());
    MappingRegistry::new(seeding, store.clone())
        .resolve(&identity("products"))
        .await
        .unwrap();

    // A fresh registry over an empty engine
    let engine = FakeEngine::new();
    let warmed = Arc::new(MemoryMappingStore::with_mappings(store.snapshot()));
    let registry = MappingRegistry::new(engine.clone(), warmed);
    assert_eq!(registry.warm().await.unwrap(), 1);

    let resolved = registry.resolve(&identity("products")).await.unwrap();
    assert!(resolved.from_cache);
    assert!(resolved.model.contains("variants.stock"));
    assert_eq!(engine.count_calls("get_mapping"), 0);
}

#[tokio::test]
async fn test_warm_keeps_fresher_cache_entries() {
    let engine = products_engine();
    let store = Arc::new(MemoryMappingStore::new());
    let registry = MappingRegistry::new(engine, store.clone());
    let products = identity("products");
    let live = registry.resolve(&products).await.unwrap().model;

    // Store now holds an older, smaller model
    let stale = halyard::registry::infer_model(
        "products",
        &serde_json::from_value(json!({"properties": {"title": {"type": "text"}}})).unwrap(),
    );
    let mut persisted = PersistedMappings::new();
    persisted.insert("products".to_string(), stale);
    store.save(&persisted).await.unwrap();

    registry.warm().await.unwrap();
    assert_eq!(registry.cached(&products).unwrap().fields, live.fields);
}

#[tokio::test]
async fn test_invalidate_forces_reintrospection() {
    let engine = products_engine();
    let registry = MappingRegistry::new(engine.clone(), Arc::new(MemoryMappingStore::new()));
    let products = identity("products");

    registry.resolve(&products).await.unwrap();
    assert!(registry.invalidate(&products).await.unwrap());
    assert!(!registry.invalidate(&products).await.unwrap());

    let resolved = registry.resolve(&products).await.unwrap();
    assert!(!resolved.from_cache);
    assert_eq!(engine.count_calls("get_mapping"), 2);
}

#[tokio::test]
async fn test_invalidate_drops_persisted_model() {
    let store = Arc::new(MemoryMappingStore::new());
    let registry = MappingRegistry::new(products_engine(), store.clone());
    let products = identity("products");

    registry.resolve(&products).await.unwrap();
    assert!(store.load().await.unwrap().contains_key("products"));

    registry.invalidate(&products).await.unwrap();
    assert!(!store.load().await.unwrap().contains_key("products"));

    // A fresh registry over the same store has nothing to warm
    let restarted = MappingRegistry::new(products_engine(), store);
    assert_eq!(restarted.warm().await.unwrap(), 0);
    assert!(restarted.cached(&products).is_none());
}

#[tokio::test]
async fn test_attributes_lists_every_leaf() {
    let registry = MappingRegistry::new(products_engine(), Arc::new(MemoryMappingStore::new()));
    let attributes = registry.attributes(&identity("products")).await.unwrap();
    assert_eq!(attributes.len(), 6);
    assert!(attributes.contains(&"variants.size".to_string()));
}
