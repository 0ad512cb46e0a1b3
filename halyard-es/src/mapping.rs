//! Typed index mapping tree
//!
//! `GET /{index}/_mapping` answers with an arbitrarily deep property tree.
//! It is decoded straight into [`Property`] nodes; keys this crate does not
//! model (analyzers, formats, `dims`, ...) are kept in `extra` so a mapping
//! can be read, edited and written back without loss.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Engine field type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    MatchOnlyText,
    Keyword,
    ConstantKeyword,
    Wildcard,
    Long,
    Integer,
    Short,
    Byte,
    Double,
    Float,
    HalfFloat,
    ScaledFloat,
    UnsignedLong,
    Date,
    DateNanos,
    Boolean,
    Object,
    Nested,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::MatchOnlyText => "match_only_text",
            FieldType::Keyword => "keyword",
            FieldType::ConstantKeyword => "constant_keyword",
            FieldType::Wildcard => "wildcard",
            FieldType::Long => "long",
            FieldType::Integer => "integer",
            FieldType::Short => "short",
            FieldType::Byte => "byte",
            FieldType::Double => "double",
            FieldType::Float => "float",
            FieldType::HalfFloat => "half_float",
            FieldType::ScaledFloat => "scaled_float",
            FieldType::UnsignedLong => "unsigned_long",
            FieldType::Date => "date",
            FieldType::DateNanos => "date_nanos",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Nested => "nested",
            FieldType::Other(name) => name,
        }
    }

    /// Analyzed string types
    pub fn is_full_text(&self) -> bool {
        matches!(self, FieldType::Text | FieldType::MatchOnlyText)
    }

    /// Unanalyzed string types usable for term filters
    pub fn is_exact_match(&self) -> bool {
        self.exact_match_rank().is_some()
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Long
                | FieldType::Integer
                | FieldType::Short
                | FieldType::Byte
                | FieldType::Double
                | FieldType::Float
                | FieldType::HalfFloat
                | FieldType::ScaledFloat
                | FieldType::UnsignedLong
        )
    }

    pub fn is_date(&self) -> bool {
        matches!(self, FieldType::Date | FieldType::DateNanos)
    }

    /// Types a terms aggregation can bucket on
    pub fn is_aggregatable(&self) -> bool {
        self.is_exact_match() || self.is_numeric() || self.is_date()
    }

    pub fn is_container(&self) -> bool {
        matches!(self, FieldType::Object | FieldType::Nested)
    }

    /// Preference among exact-match types, lower wins
    pub fn exact_match_rank(&self) -> Option<u8> {
        match self {
            FieldType::Keyword => Some(0),
            FieldType::ConstantKeyword => Some(1),
            FieldType::Wildcard => Some(2),
            _ => None,
        }
    }
}

impl From<String> for FieldType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "text" => FieldType::Text,
            "match_only_text" => FieldType::MatchOnlyText,
            "keyword" => FieldType::Keyword,
            "constant_keyword" => FieldType::ConstantKeyword,
            "wildcard" => FieldType::Wildcard,
            "long" => FieldType::Long,
            "integer" => FieldType::Integer,
            "short" => FieldType::Short,
            "byte" => FieldType::Byte,
            "double" => FieldType::Double,
            "float" => FieldType::Float,
            "half_float" => FieldType::HalfFloat,
            "scaled_float" => FieldType::ScaledFloat,
            "unsigned_long" => FieldType::UnsignedLong,
            "date" => FieldType::Date,
            "date_nanos" => FieldType::DateNanos,
            "boolean" => FieldType::Boolean,
            "object" => FieldType::Object,
            "nested" => FieldType::Nested,
            _ => FieldType::Other(name),
        }
    }
}

impl From<&str> for FieldType {
    fn from(name: &str) -> Self {
        FieldType::from(name.to_string())
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Other(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `GET /{index}/_mapping` response, keyed by concrete index name
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GetMappingResponse {
    #[serde(flatten)]
    pub indices: BTreeMap<String, IndexMapping>,
}

impl GetMappingResponse {
    /// The mapping of the one index the request resolved to.
    ///
    /// Asking through an alias bound to several indices is rejected.
    pub fn into_single(self) -> Result<(String, TypeMapping), EngineError> {
        let count = self.indices.len();
        let mut indices = self.indices.into_iter();
        match (indices.next(), count) {
            (Some((index, mapping)), 1) => Ok((index, mapping.mappings)),
            (None, _) => Err(EngineError::Decode(
                "mapping response names no index".to_string(),
            )),
            (Some(_), n) => Err(EngineError::Decode(format!(
                "mapping response names {n} indices, expected one"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IndexMapping {
    #[serde(default)]
    pub mappings: TypeMapping,
}

/// Root of an index mapping
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TypeMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic: Option<Value>,

    #[serde(default)]
    pub properties: BTreeMap<String, Property>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One node of the property tree
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Property {
    /// Absent on plain objects, which the engine reports by `properties` alone
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Property>,

    /// Multi-fields
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Property>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_values: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_above: Option<u32>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Property {
    pub fn typed(field_type: FieldType) -> Self {
        Self {
            field_type: Some(field_type),
            ..Default::default()
        }
    }

    pub fn object(properties: BTreeMap<String, Property>) -> Self {
        Self {
            field_type: Some(FieldType::Object),
            properties,
            ..Default::default()
        }
    }

    pub fn with_subfield(mut self, name: impl Into<String>, sub: Property) -> Self {
        self.fields.insert(name.into(), sub);
        self
    }

    /// Declared type; untyped nodes are plain objects
    pub fn effective_type(&self) -> FieldType {
        self.field_type.clone().unwrap_or(FieldType::Object)
    }

    /// Object or nested node
    pub fn is_container(&self) -> bool {
        !self.properties.is_empty() || self.effective_type().is_container()
    }

    pub fn is_nested(&self) -> bool {
        self.field_type == Some(FieldType::Nested)
    }
}
