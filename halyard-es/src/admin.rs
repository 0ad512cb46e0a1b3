//! Index administration bodies: creation, aliases, reindex

use crate::mapping::TypeMapping;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// `PUT /{index}` body
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CreateIndexRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mappings: Option<TypeMapping>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, AliasOptions>,
}

impl CreateIndexRequest {
    pub fn with_mappings(mappings: TypeMapping) -> Self {
        Self {
            mappings: Some(mappings),
            ..Default::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), AliasOptions::default());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AliasOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_write_index: Option<bool>,
}

/// One action of `POST /_aliases`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasAction {
    Add(AliasTarget),
    Remove(AliasTarget),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AliasTarget {
    pub index: String,
    pub alias: String,
}

impl AliasAction {
    pub fn add(index: impl Into<String>, alias: impl Into<String>) -> Self {
        AliasAction::Add(AliasTarget {
            index: index.into(),
            alias: alias.into(),
        })
    }

    pub fn remove(index: impl Into<String>, alias: impl Into<String>) -> Self {
        AliasAction::Remove(AliasTarget {
            index: index.into(),
            alias: alias.into(),
        })
    }

    pub fn target(&self) -> &AliasTarget {
        match self {
            AliasAction::Add(target) | AliasAction::Remove(target) => target,
        }
    }
}

/// `POST /_aliases` body; the engine applies all actions atomically
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UpdateAliasesRequest {
    pub actions: Vec<AliasAction>,
}

impl UpdateAliasesRequest {
    /// Move `alias` from one index to another in a single request
    pub fn swap(alias: &str, from: &str, to: &str) -> Self {
        Self {
            actions: vec![AliasAction::remove(from, alias), AliasAction::add(to, alias)],
        }
    }
}

/// `GET /_alias/{alias}` response, keyed by concrete index name
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GetAliasResponse {
    #[serde(flatten)]
    pub indices: BTreeMap<String, IndexAliases>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IndexAliases {
    #[serde(default)]
    pub aliases: BTreeMap<String, Value>,
}

impl GetAliasResponse {
    /// Indices the alias is bound to, in name order
    pub fn into_indices(self) -> Vec<String> {
        self.indices.into_keys().collect()
    }
}

/// `POST /_reindex` body
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReindexRequest {
    pub source: ReindexIndex,
    pub dest: ReindexIndex,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReindexIndex {
    pub index: String,
}

impl ReindexRequest {
    pub fn new(source: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            source: ReindexIndex {
                index: source.into(),
            },
            dest: ReindexIndex { index: dest.into() },
        }
    }
}

/// Result of a reindex run with `wait_for_completion=true`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReindexResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub updated: u64,
    #[serde(default)]
    pub failures: Vec<Value>,
}

impl ReindexResponse {
    pub fn is_clean(&self) -> bool {
        !self.timed_out && self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Acknowledged {
    #[serde(default)]
    pub acknowledged: bool,
}

/// `PUT /{index}/_doc/{id}` response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IndexDocumentResponse {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub result: String,
}
