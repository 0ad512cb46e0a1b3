//! Facet aggregation synthesis and result parsing

use super::Addressing;
use crate::error::Result;
use crate::model::{AggregationResult, FacetBucket, FacetRequest, FacetSpec, MappingModel};
use halyard_es::response::TermsBuckets;
use halyard_es::{EngineError, EsAggregation};
use serde_json::Value;
use std::collections::BTreeMap;

/// Name of the aggregation inside each nested scope
pub const FACET_VALUES_AGG: &str = "facet_values";

/// Builds terms aggregations for facets and reads their buckets back
#[derive(Debug, Clone, Default)]
pub struct FacetSynthesizer;

/// A facet that can be served, with where its buckets come from
struct Plan<'a> {
    spec: &'a FacetSpec,
    field: String,
    addressing: Addressing,
}

impl FacetSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// One aggregation per servable facet, keyed by facet key.
    ///
    /// Facets naming unknown or non-aggregatable fields are left out.
    pub fn build_aggregations(
        &self,
        request: &FacetRequest,
        model: &MappingModel,
    ) -> BTreeMap<String, EsAggregation> {
        plans(request, model)
            .into_iter()
            .map(|plan| {
                let size = (plan.spec.size > 0).then_some(plan.spec.size);
                let terms = EsAggregation::terms(plan.field, size);
                (plan.spec.key.clone(), plan.addressing.wrap_aggregation(terms))
            })
            .collect()
    }

    /// Read the buckets for each servable facet out of a search response.
    ///
    /// Keys the request did not ask for are ignored, as are requested keys
    /// missing from the response.
    pub fn parse_aggregations(
        &self,
        raw: &BTreeMap<String, Value>,
        request: &FacetRequest,
        model: &MappingModel,
    ) -> Result<AggregationResult> {
        let mut result = AggregationResult::default();

        for plan in plans(request, model) {
            let Some(entry) = raw.get(&plan.spec.key) else {
                continue;
            };

            let terms = plan.addressing.unwrap_aggregation(entry).ok_or_else(|| {
                EngineError::Decode(format!(
                    "aggregation '{}' is missing its {} level",
                    plan.spec.key, FACET_VALUES_AGG
                ))
            })?;

            let buckets: TermsBuckets = serde_json::from_value(terms.clone()).map_err(|e| {
                EngineError::Decode(format!("aggregation '{}': {e}", plan.spec.key))
            })?;

            result.facets.insert(
                plan.spec.key.clone(),
                buckets
                    .buckets
                    .into_iter()
                    .map(|bucket| FacetBucket {
                        value: bucket.key,
                        doc_count: bucket.doc_count,
                    })
                    .collect(),
            );
        }

        Ok(result)
    }
}

fn plans<'a>(request: &'a FacetRequest, model: &MappingModel) -> Vec<Plan<'a>> {
    request
        .facets
        .iter()
        .filter_map(|spec| {
            let Some(mapping) = model.get(&spec.field) else {
                tracing::debug!(facet = %spec.key, field = %spec.field, "Dropping facet on unknown field");
                return None;
            };
            let Some(field) = mapping.aggregation_field(&spec.field) else {
                tracing::debug!(facet = %spec.key, field = %spec.field, "Dropping facet on non-aggregatable field");
                return None;
            };
            Some(Plan {
                spec,
                field,
                addressing: Addressing::for_field(mapping),
            })
        })
        .collect()
}
