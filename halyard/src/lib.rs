//! Halyard: mapping-aware search configuration for Elasticsearch
//!
//! Halyard sits in front of an Elasticsearch-style engine. It learns each
//! index's field mappings, turns generic search, filter and facet requests
//! into the engine's query DSL, and evolves an index's schema with a
//! blue/green reindex behind stable read and write aliases.
//!
//! The main entry point is [`SearchService`]. The pieces it composes are
//! usable on their own:
//!
//! - [`MappingRegistry`] resolves and caches per-index [`MappingModel`]s
//! - [`QuerySynthesizer`] and [`FacetSynthesizer`] build request bodies
//! - [`MigrationEngine`] runs the alias-swap reindex protocol
//! - [`MappingStore`] persists learned mappings across restarts

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod migration;
pub mod model;
pub mod registry;
pub mod service;
pub mod store;
pub mod synth;
pub mod telemetry;

pub use config::Config;
pub use error::{Error, Result};
pub use migration::{MigrationEngine, MigrationReport, MigrationStep, MigrationTarget};
pub use model::{
    AggregationResult, FacetRequest, FieldMapping, IdentityDeriver, IndexIdentity, IndexSettings,
    MappingModel, SearchRequest, SuffixIdentityDeriver,
};
pub use registry::{MappingRegistry, ResolvedMapping};
pub use service::SearchService;
pub use store::{FileMappingStore, MappingStore, MemoryMappingStore, StoreError};
pub use synth::{Addressing, FacetSynthesizer, QuerySynthesizer};
