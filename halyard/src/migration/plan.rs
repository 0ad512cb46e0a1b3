//! Mapping derivation and index naming for migrations

use crate::error::{Error, Result};
use crate::model::IndexSettings;
use halyard_es::mapping::{Property, TypeMapping};
use halyard_es::FieldType;
use std::collections::{BTreeMap, BTreeSet};

/// `ignore_above` on the exact-match sub-field of searchable facets
pub const KEYWORD_IGNORE_ABOVE: u32 = 256;
/// Name of the exact-match sub-field added to searchable facets
pub const KEYWORD_SUBFIELD: &str = "keyword";

#[derive(Clone, Copy)]
struct Role {
    searchable: bool,
    facetable: bool,
}

struct Attributes<'a> {
    searchable: BTreeSet<&'a str>,
    facetable: BTreeSet<&'a str>,
}

impl<'a> Attributes<'a> {
    fn new(settings: &'a IndexSettings) -> Self {
        Self {
            searchable: settings.searchable_attributes.iter().map(String::as_str).collect(),
            facetable: settings.facet_attributes.iter().map(String::as_str).collect(),
        }
    }

    fn role(&self, address: &str) -> Role {
        Role {
            searchable: self.searchable.contains(address),
            facetable: self.facetable.contains(address),
        }
    }

    /// The listed attribute equal to `address`, if any
    fn lookup(&self, address: &str) -> Option<&'a str> {
        self.searchable
            .get(address)
            .or_else(|| self.facetable.get(address))
            .copied()
    }

    fn all(&self) -> BTreeSet<&'a str> {
        self.searchable.union(&self.facetable).copied().collect()
    }
}

/// Derive the mapping of the next index from the current one.
///
/// Searchable fields become `text`, facetable fields exact-match, and both
/// together `text` with a `keyword` sub-field. A searchable field that
/// already had an exact-match form also gets the sub-field. Every other leaf
/// keeps its type but stops being indexed. Attributes the current mapping lacks are
/// added, with intermediate objects as needed.
pub fn plan_mapping(current: &TypeMapping, settings: &IndexSettings) -> Result<TypeMapping> {
    if settings.is_empty() {
        return Err(Error::Validation(
            "migration needs at least one searchable or facetable attribute".to_string(),
        ));
    }

    let attributes = Attributes::new(settings);
    let mut seen = BTreeSet::new();
    let mut properties = rebuild("", &current.properties, &attributes, &mut seen)?;

    for address in attributes.all() {
        if seen.contains(address) {
            continue;
        }
        let leaf = leaf_property(None, attributes.role(address));
        insert_missing(&mut properties, address, leaf)?;
    }

    Ok(TypeMapping {
        dynamic: current.dynamic.clone(),
        properties,
        extra: current.extra.clone(),
    })
}

fn rebuild<'a>(
    prefix: &str,
    properties: &BTreeMap<String, Property>,
    attributes: &Attributes<'a>,
    seen: &mut BTreeSet<&'a str>,
) -> Result<BTreeMap<String, Property>> {
    let mut rebuilt = BTreeMap::new();

    for (name, property) in properties {
        let address = join(prefix, name);

        let next = if property.is_container() {
            if attributes.lookup(&address).is_some() {
                return Err(Error::Validation(format!(
                    "'{address}' is an object and cannot be searched or faceted"
                )));
            }
            Property {
                field_type: property.field_type.clone(),
                properties: rebuild(&address, &property.properties, attributes, seen)?,
                extra: property.extra.clone(),
                ..Default::default()
            }
        } else {
            if let Some(listed) = attributes.lookup(&address) {
                seen.insert(listed);
            }
            leaf_property(Some(property), attributes.role(&address))
        };

        rebuilt.insert(name.clone(), next);
    }

    Ok(rebuilt)
}

fn leaf_property(existing: Option<&Property>, role: Role) -> Property {
    let existing_type = existing.map(Property::effective_type);
    // Type-specific parameters (analyzer, format, scaling_factor) survive
    // only while the type does
    let keep_extra = |field_type: &FieldType| match existing {
        Some(prop) if existing_type.as_ref() == Some(field_type) => prop.extra.clone(),
        _ => BTreeMap::new(),
    };

    // A searchable field that could already be matched exactly keeps that
    // ability, so existing filters on it go on working
    let had_exact = existing.is_some_and(has_exact_form);

    match (role.searchable, role.facetable, existing_type.as_ref()) {
        (true, facetable, _) if facetable || had_exact => {
            let keyword = Property {
                ignore_above: Some(KEYWORD_IGNORE_ABOVE),
                ..Property::typed(FieldType::Keyword)
            };
            Property {
                extra: keep_extra(&FieldType::Text),
                ..Property::typed(FieldType::Text)
            }
            .with_subfield(KEYWORD_SUBFIELD, keyword)
        }
        (true, _, _) => Property {
            extra: keep_extra(&FieldType::Text),
            ..Property::typed(FieldType::Text)
        },
        (false, true, Some(field_type)) if field_type.is_aggregatable() => Property {
            extra: keep_extra(field_type),
            ..Property::typed(field_type.clone())
        },
        (false, true, _) => Property::typed(FieldType::Keyword),
        (false, false, field_type) => {
            let field_type = field_type.cloned().unwrap_or(FieldType::Keyword);
            Property {
                index: Some(false),
                doc_values: (!field_type.is_full_text()).then_some(false),
                extra: keep_extra(&field_type),
                ..Property::typed(field_type)
            }
        }
    }
}

fn has_exact_form(property: &Property) -> bool {
    property.effective_type().is_exact_match()
        || property
            .fields
            .values()
            .any(|sub| sub.effective_type().is_exact_match())
}

fn insert_missing(
    properties: &mut BTreeMap<String, Property>,
    address: &str,
    leaf: Property,
) -> Result<()> {
    let (parents, name) = match address.rsplit_once('.') {
        Some((parents, name)) => (Some(parents), name),
        None => (None, address),
    };

    let mut level = properties;
    let mut walked = String::new();
    for segment in parents.into_iter().flat_map(|p| p.split('.')) {
        if !walked.is_empty() {
            walked.push('.');
        }
        walked.push_str(segment);

        let node = level
            .entry(segment.to_string())
            .or_insert_with(|| Property::object(BTreeMap::new()));
        if !node.is_container() {
            return Err(Error::Validation(format!(
                "cannot add '{address}': '{walked}' is a field, not an object"
            )));
        }
        level = &mut node.properties;
    }

    level.insert(name.to_string(), leaf);
    Ok(())
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Name of the index that follows `current` for `base`.
///
/// `base` itself counts as generation 0, `base-000007` as generation 7.
pub fn next_index_name(base: &str, current: &str, width: usize) -> String {
    let generation = current
        .strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('-'))
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse::<u64>().ok())
        .unwrap_or(0);

    format!("{base}-{:0width$}", generation + 1)
}
