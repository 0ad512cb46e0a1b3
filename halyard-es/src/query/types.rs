//! Elasticsearch Query DSL types
//!
//! These types cover the subset of the Query DSL and aggregation DSL that
//! Halyard emits. Maps are ordered so serialized bodies are deterministic.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Root search request body
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EsSearchRequest {
    pub query: EsQuery,

    /// Starting offset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,

    /// Maximum number of hits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,

    #[serde(
        default,
        alias = "aggregations",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub aggs: BTreeMap<String, EsAggregation>,
}

impl EsSearchRequest {
    pub fn new(query: EsQuery) -> Self {
        Self {
            query,
            from: None,
            size: None,
            aggs: BTreeMap::new(),
        }
    }
}

/// Query clauses
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EsQuery {
    /// Match all documents
    MatchAll(MatchAllQuery),

    /// Analyzed full-text match, optionally fuzzy
    Match(BTreeMap<String, MatchParams>),

    /// Exact phrase match
    MatchPhrase(BTreeMap<String, MatchPhraseParams>),

    /// Terms matched as a bool of term queries, last term as prefix
    MatchBoolPrefix(BTreeMap<String, MatchBoolPrefixParams>),

    /// Exact single value
    Term(BTreeMap<String, Value>),

    /// Exact match against any of several values
    Terms(BTreeMap<String, Vec<Value>>),

    Bool(BoolQuery),

    /// Query against inner documents of a nested object
    Nested(NestedQuery),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MatchAllQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MatchParams {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzziness: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MatchPhraseParams {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MatchBoolPrefixParams {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BoolQuery {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<EsQuery>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<EsQuery>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<EsQuery>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<EsQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NestedQuery {
    pub path: String,
    pub query: Box<EsQuery>,
}

impl EsQuery {
    pub fn match_all() -> Self {
        EsQuery::MatchAll(MatchAllQuery::default())
    }

    pub fn match_phrase(field: impl Into<String>, query: impl Into<String>, boost: f64) -> Self {
        EsQuery::MatchPhrase(BTreeMap::from([(
            field.into(),
            MatchPhraseParams {
                query: query.into(),
                boost: Some(boost),
            },
        )]))
    }

    /// Fuzzy match with `fuzziness: AUTO`
    pub fn fuzzy_match(field: impl Into<String>, query: impl Into<String>, boost: f64) -> Self {
        EsQuery::Match(BTreeMap::from([(
            field.into(),
            MatchParams {
                query: query.into(),
                fuzziness: Some("AUTO".to_string()),
                boost: Some(boost),
            },
        )]))
    }

    pub fn match_bool_prefix(
        field: impl Into<String>,
        query: impl Into<String>,
        boost: f64,
    ) -> Self {
        EsQuery::MatchBoolPrefix(BTreeMap::from([(
            field.into(),
            MatchBoolPrefixParams {
                query: query.into(),
                boost: Some(boost),
            },
        )]))
    }

    pub fn term(field: impl Into<String>, value: Value) -> Self {
        EsQuery::Term(BTreeMap::from([(field.into(), value)]))
    }

    pub fn terms(field: impl Into<String>, values: Vec<Value>) -> Self {
        EsQuery::Terms(BTreeMap::from([(field.into(), values)]))
    }

    pub fn nested(path: impl Into<String>, query: EsQuery) -> Self {
        EsQuery::Nested(NestedQuery {
            path: path.into(),
            query: Box::new(query),
        })
    }
}

/// Aggregation node.
///
/// Only the bucket shapes Halyard builds are modelled: a `terms` leaf, or a
/// `nested` scope with sub-aggregations.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EsAggregation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<TermsAgg>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<NestedAgg>,

    #[serde(
        default,
        alias = "aggregations",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub aggs: BTreeMap<String, EsAggregation>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TermsAgg {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NestedAgg {
    pub path: String,
}

impl EsAggregation {
    pub fn terms(field: impl Into<String>, size: Option<usize>) -> Self {
        Self {
            terms: Some(TermsAgg {
                field: field.into(),
                size,
            }),
            ..Default::default()
        }
    }

    /// Scope `inner` to the nested object at `path`, naming it `name`
    pub fn nested(path: impl Into<String>, name: impl Into<String>, inner: EsAggregation) -> Self {
        Self {
            nested: Some(NestedAgg { path: path.into() }),
            aggs: BTreeMap::from([(name.into(), inner)]),
            ..Default::default()
        }
    }
}
