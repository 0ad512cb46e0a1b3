//! Flattening of a mapping tree into field addresses

use crate::model::{FieldMapping, MappingModel};
use halyard_es::mapping::{Property, TypeMapping};
use std::collections::BTreeMap;
use std::ops::Bound;

/// Build the flat field table for `index` from its mapping tree
pub fn infer_model(index: &str, mapping: &TypeMapping) -> MappingModel {
    let mut fields = BTreeMap::new();
    walk("", &mapping.properties, &mut fields);
    MappingModel::new(index, fields)
}

fn walk(
    prefix: &str,
    properties: &BTreeMap<String, Property>,
    fields: &mut BTreeMap<String, FieldMapping>,
) {
    for (name, property) in properties {
        let address = join(prefix, name);

        if property.is_container() {
            walk(&address, &property.properties, fields);
            // Post-order so inner nested paths are already recorded and the
            // outer one lands in front of them
            if property.is_nested() {
                mark_nested(&address, fields);
            }
        } else {
            fields.insert(address, leaf(prefix, property));
        }
    }
}

fn leaf(parent: &str, property: &Property) -> FieldMapping {
    let primary = property.effective_type();

    let mut data_types = vec![primary.clone()];
    let mut subfields = Vec::with_capacity(property.fields.len());
    for (sub_name, sub) in &property.fields {
        data_types.push(sub.effective_type());
        subfields.push(sub_name.clone());
    }

    let exact_subfield = if primary.is_exact_match() {
        None
    } else {
        property
            .fields
            .iter()
            .filter_map(|(name, sub)| {
                let rank = sub.effective_type().exact_match_rank()?;
                Some((rank, name))
            })
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, name)| name.clone())
    };

    FieldMapping {
        path: parent.to_string(),
        data_types,
        is_nested: false,
        nested_paths: Vec::new(),
        subfields,
        exact_subfield,
    }
}

fn mark_nested(nested_path: &str, fields: &mut BTreeMap<String, FieldMapping>) {
    let prefix = format!("{nested_path}.");
    let descendants = fields
        .range_mut::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
        .take_while(|(address, _)| address.starts_with(&prefix));

    for (_, field) in descendants {
        field.nested_paths.insert(0, nested_path.to_string());
        field.is_nested = true;
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
