//! How a field is reached from the root document
//!
//! Fields under `nested` objects live in separate inner documents, so every
//! query, filter and aggregation against them must be scoped to each nested
//! ancestor in turn. The decision is made once per field here and shared by
//! both synthesizers.

use super::facets::FACET_VALUES_AGG;
use crate::model::FieldMapping;
use halyard_es::{EsAggregation, EsQuery};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Addressing {
    /// Root-level or plain object field
    Direct,
    /// Nested ancestors, outermost first
    NestedEnvelope(Vec<String>),
}

impl Addressing {
    pub fn for_field(field: &FieldMapping) -> Self {
        if field.is_nested && !field.nested_paths.is_empty() {
            Addressing::NestedEnvelope(field.nested_paths.clone())
        } else if field.is_nested {
            // Models persisted without nested_paths only know the parent
            Addressing::NestedEnvelope(vec![field.path.clone()])
        } else {
            Addressing::Direct
        }
    }

    /// Number of `nested` levels around the field
    pub fn depth(&self) -> usize {
        match self {
            Addressing::Direct => 0,
            Addressing::NestedEnvelope(paths) => paths.len(),
        }
    }

    fn paths(&self) -> &[String] {
        match self {
            Addressing::Direct => &[],
            Addressing::NestedEnvelope(paths) => paths,
        }
    }

    pub fn wrap_query(&self, query: EsQuery) -> EsQuery {
        self.paths()
            .iter()
            .rev()
            .fold(query, |inner, path| EsQuery::nested(path.clone(), inner))
    }

    /// Scope an aggregation, naming each inner level [`FACET_VALUES_AGG`]
    pub fn wrap_aggregation(&self, aggregation: EsAggregation) -> EsAggregation {
        self.paths().iter().rev().fold(aggregation, |inner, path| {
            EsAggregation::nested(path.clone(), FACET_VALUES_AGG, inner)
        })
    }

    /// Descend through the levels [`Addressing::wrap_aggregation`] added
    pub fn unwrap_aggregation<'a>(&self, raw: &'a Value) -> Option<&'a Value> {
        (0..self.depth()).try_fold(raw, |level, _| level.get(FACET_VALUES_AGG))
    }
}
