//! Elasticsearch wire layer for Halyard
//!
//! This crate owns everything that crosses the wire to the search engine:
//!
//! - `query` - the subset of the Query DSL and aggregation DSL Halyard emits
//! - `mapping` - a typed, recursive view of index mappings
//! - `admin` - alias actions, index creation and reindex bodies
//! - `response` - search hits and terms-aggregation bucket shapes
//! - `client` - the [`EngineClient`] trait and its HTTP implementation
//!
//! Nothing here knows about Halyard's field-mapping model or migration
//! protocol; the core crate builds on these types.

pub mod admin;
pub mod client;
pub mod error;
pub mod mapping;
pub mod query;
pub mod response;

pub use client::{EngineClient, HttpClientConfig, HttpEngineClient};
pub use error::EngineError;
pub use mapping::{FieldType, GetMappingResponse, Property, TypeMapping};
pub use query::{EsAggregation, EsQuery, EsSearchRequest};
pub use response::EsSearchResponse;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
