//! Search response shapes

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// `POST /{index}/_search` response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EsSearchResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub hits: EsHits,
    /// Raw aggregation results, keyed by the names in the request
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aggregations: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EsHits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<EsTotal>,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub hits: Vec<EsHit>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EsTotal {
    pub value: u64,
    /// `eq` or `gte`
    pub relation: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EsHit {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

/// Terms aggregation result
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TermsBuckets {
    #[serde(default)]
    pub doc_count_error_upper_bound: u64,
    #[serde(default)]
    pub sum_other_doc_count: u64,
    pub buckets: Vec<EsBucket>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EsBucket {
    /// String for keyword fields, number for numeric and date fields
    pub key: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_as_string: Option<String>,
    pub doc_count: u64,
}
