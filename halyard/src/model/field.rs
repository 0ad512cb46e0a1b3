use chrono::{DateTime, Utc};
use halyard_es::FieldType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What Halyard knows about one addressable leaf field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Structural parent: the field's address minus its last segment
    pub path: String,

    /// Primary type first, then multi-field types in sub-field name order
    pub data_types: Vec<FieldType>,

    pub is_nested: bool,

    /// Every `nested` ancestor, outermost first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested_paths: Vec<String>,

    /// Multi-field names, aligned with `data_types[1..]`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subfields: Vec<String>,

    /// Sub-field holding the exact-match representation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_subfield: Option<String>,
}

impl FieldMapping {
    pub fn primary_type(&self) -> Option<&FieldType> {
        self.data_types.first()
    }

    pub fn is_aggregatable(&self) -> bool {
        self.data_types.iter().any(FieldType::is_aggregatable)
    }

    pub fn is_full_text(&self) -> bool {
        self.primary_type().is_some_and(FieldType::is_full_text)
    }

    /// Field name a term or terms filter should target.
    ///
    /// Analyzed fields are redirected to their exact-match sub-field when
    /// they have one; everything else is filtered as-is.
    pub fn term_field(&self, address: &str) -> String {
        match (&self.exact_subfield, self.is_full_text()) {
            (Some(sub), true) => format!("{address}.{sub}"),
            _ => address.to_string(),
        }
    }

    /// Field name a terms aggregation can bucket on, if any
    pub fn aggregation_field(&self, address: &str) -> Option<String> {
        if self.primary_type().is_some_and(FieldType::is_aggregatable) {
            return Some(address.to_string());
        }
        if let Some(sub) = &self.exact_subfield {
            return Some(format!("{address}.{sub}"));
        }
        self.subfields
            .iter()
            .zip(self.data_types.iter().skip(1))
            .find(|(_, field_type)| field_type.is_aggregatable())
            .map(|(sub, _)| format!("{address}.{sub}"))
    }
}

/// Flat `address -> FieldMapping` table for one index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingModel {
    /// Physical index the mapping was read from
    pub index: String,
    pub learned_at: DateTime<Utc>,
    pub fields: BTreeMap<String, FieldMapping>,
}

impl MappingModel {
    pub fn new(index: impl Into<String>, fields: BTreeMap<String, FieldMapping>) -> Self {
        Self {
            index: index.into(),
            learned_at: Utc::now(),
            fields,
        }
    }

    pub fn get(&self, address: &str) -> Option<&FieldMapping> {
        self.fields.get(address)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.fields.contains_key(address)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
