use super::IndexIdentity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A group of attributes searched with one boost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(rename = "names", alias = "attributes")]
    pub attributes: Vec<String>,
    pub boost: f64,
}

impl SearchConfig {
    pub fn new<S: Into<String>>(attributes: impl IntoIterator<Item = S>, boost: f64) -> Self {
        Self {
            attributes: attributes.into_iter().map(Into::into).collect(),
            boost,
        }
    }
}

/// One filter constraint; its values are ORed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConstraint {
    pub field: String,
    pub values: Vec<Value>,
}

impl FilterConstraint {
    pub fn new(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            values,
        }
    }
}

/// Generic search request. Filter constraints are ANDed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub index: IndexIdentity,

    #[serde(rename = "search_attribute", default)]
    pub search_config: Vec<SearchConfig>,

    #[serde(default)]
    pub search_string: String,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default)]
    pub cursor: usize,

    #[serde(default)]
    pub filter: Vec<FilterConstraint>,
}

fn default_page_size() -> usize {
    10
}

impl SearchRequest {
    pub fn new(index: IndexIdentity) -> Self {
        Self {
            index,
            search_config: Vec::new(),
            search_string: String::new(),
            page_size: default_page_size(),
            cursor: 0,
            filter: Vec::new(),
        }
    }

    pub fn search(mut self, search_string: impl Into<String>, config: Vec<SearchConfig>) -> Self {
        self.search_string = search_string.into();
        self.search_config = config;
        self
    }

    pub fn filter(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.filter.push(FilterConstraint::new(field, values));
        self
    }

    pub fn page(mut self, cursor: usize, page_size: usize) -> Self {
        self.cursor = cursor;
        self.page_size = page_size;
        self
    }
}

/// One requested facet. A size of 0 leaves the bucket count to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetSpec {
    pub key: String,
    pub field: String,
    #[serde(default)]
    pub size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetRequest {
    pub facets: Vec<FacetSpec>,
}

impl FacetRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn facet(mut self, key: impl Into<String>, field: impl Into<String>, size: usize) -> Self {
        self.facets.push(FacetSpec {
            key: key.into(),
            field: field.into(),
            size,
        });
        self
    }
}

/// Desired searchable and facetable attributes for a migration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSettings {
    #[serde(default)]
    pub searchable_attributes: Vec<String>,
    #[serde(default)]
    pub facet_attributes: Vec<String>,
}

impl IndexSettings {
    pub fn new<S: Into<String>, F: Into<String>>(
        searchable: impl IntoIterator<Item = S>,
        facetable: impl IntoIterator<Item = F>,
    ) -> Self {
        Self {
            searchable_attributes: searchable.into_iter().map(Into::into).collect(),
            facet_attributes: facetable.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.searchable_attributes.is_empty() && self.facet_attributes.is_empty()
    }
}

/// A document to index; the engine assigns an id when none is given
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, source: Value) -> Self {
        Self {
            id: Some(id.into()),
            source,
        }
    }
}
