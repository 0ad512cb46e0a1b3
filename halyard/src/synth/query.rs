//! Search request synthesis

use super::Addressing;
use crate::config::SynthesisConfig;
use crate::error::{Error, Result};
use crate::model::{FilterConstraint, MappingModel, SearchConfig, SearchRequest};
use halyard_es::query::BoolQuery;
use halyard_es::{EsQuery, EsSearchRequest};

/// Upper end of the normalized boost scale
const BOOST_SCALE: f64 = 10.0;
const FUZZY_BOOST_FACTOR: f64 = 0.8;
const PREFIX_BOOST_FACTOR: f64 = 0.5;

/// Turns a [`SearchRequest`] into a search body for one index's mapping
#[derive(Debug, Clone)]
pub struct QuerySynthesizer {
    normalize_boosts: bool,
    max_page_size: usize,
}

impl Default for QuerySynthesizer {
    fn default() -> Self {
        Self::new(&SynthesisConfig::default())
    }
}

impl QuerySynthesizer {
    pub fn new(config: &SynthesisConfig) -> Self {
        Self {
            normalize_boosts: config.normalize_boosts,
            max_page_size: config.max_page_size,
        }
    }

    pub fn build_query(
        &self,
        request: &SearchRequest,
        model: &MappingModel,
    ) -> Result<EsSearchRequest> {
        // Filters are validated first so a bad request never yields a body
        let filter = build_filters(&request.filter, model)?;
        if let Some(config) = request
            .search_config
            .iter()
            .find(|c| !c.boost.is_finite() || c.boost < 0.0)
        {
            return Err(Error::Validation(format!(
                "boost for {:?} must be a finite, non-negative number, got {}",
                config.attributes, config.boost
            )));
        }

        let should = if request.search_string.trim().is_empty() {
            Vec::new()
        } else if self.normalize_boosts {
            full_text_clauses(
                &normalize_boosts(&request.search_config),
                &request.search_string,
                model,
            )
        } else {
            full_text_clauses(&request.search_config, &request.search_string, model)
        };

        let query = if should.is_empty() && filter.is_empty() {
            EsQuery::match_all()
        } else {
            let minimum_should_match = (!should.is_empty()).then_some(1);
            EsQuery::Bool(BoolQuery {
                should,
                filter,
                minimum_should_match,
                ..Default::default()
            })
        };

        let mut body = EsSearchRequest::new(query);
        body.from = Some(request.cursor);
        body.size = Some(request.page_size.min(self.max_page_size));

        tracing::debug!(
            index = %request.index.base_name,
            body = %serde_json::to_string(&body).unwrap_or_default(),
            "Synthesized search body"
        );
        Ok(body)
    }
}

/// Rescale boosts onto 0..=10 against the largest one.
///
/// Negative and non-finite boosts become 0. Leaves the rest untouched when
/// none is positive.
pub fn normalize_boosts(configs: &[SearchConfig]) -> Vec<SearchConfig> {
    let clamped: Vec<SearchConfig> = configs
        .iter()
        .map(|c| SearchConfig {
            attributes: c.attributes.clone(),
            boost: if c.boost.is_finite() { c.boost.max(0.0) } else { 0.0 },
        })
        .collect();

    let max = clamped.iter().map(|c| c.boost).fold(0.0, f64::max);
    if max <= 0.0 {
        return clamped;
    }

    clamped
        .into_iter()
        .map(|c| SearchConfig {
            boost: c.boost / max * BOOST_SCALE,
            ..c
        })
        .collect()
}

fn full_text_clauses(configs: &[SearchConfig], text: &str, model: &MappingModel) -> Vec<EsQuery> {
    let mut clauses = Vec::new();

    for config in configs {
        for attribute in &config.attributes {
            let Some(field) = model.get(attribute) else {
                tracing::debug!(attribute = %attribute, "Skipping unknown search attribute");
                continue;
            };

            let boost = config.boost;
            let group = EsQuery::Bool(BoolQuery {
                should: vec![
                    EsQuery::match_phrase(attribute, text, boost),
                    EsQuery::fuzzy_match(attribute, text, boost * FUZZY_BOOST_FACTOR),
                    EsQuery::match_bool_prefix(attribute, text, boost * PREFIX_BOOST_FACTOR),
                ],
                ..Default::default()
            });

            clauses.push(Addressing::for_field(field).wrap_query(group));
        }
    }

    clauses
}

fn build_filters(constraints: &[FilterConstraint], model: &MappingModel) -> Result<Vec<EsQuery>> {
    constraints
        .iter()
        .map(|constraint| {
            let field = model.get(&constraint.field).ok_or_else(|| {
                Error::Validation(format!("unknown filter field '{}'", constraint.field))
            })?;

            let target = field.term_field(&constraint.field);
            let clause = match constraint.values.as_slice() {
                [] => {
                    return Err(Error::Validation(format!(
                        "filter on '{}' has no values",
                        constraint.field
                    )))
                }
                [single] => EsQuery::term(target, single.clone()),
                values => EsQuery::terms(target, values.to_vec()),
            };

            Ok(Addressing::for_field(field).wrap_query(clause))
        })
        .collect()
}
