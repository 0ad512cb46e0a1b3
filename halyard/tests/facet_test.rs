//! Facet aggregation building and bucket parsing

mod common;

use common::products_mapping;
use halyard::model::FacetBucket;
use halyard::registry::infer_model;
use halyard::{Error, FacetRequest, FacetSynthesizer, MappingModel};
use halyard_es::EngineError;
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn products_model() -> MappingModel {
    infer_model("products", &serde_json::from_value(products_mapping()).unwrap())
}

fn raw(value: Value) -> BTreeMap<String, Value> {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_text_only_facet_is_dropped() {
    let model = products_model();
    let request = FacetRequest::new()
        .facet("descriptions", "description", 10)
        .facet("colors", "color", 10);

    let aggs = FacetSynthesizer::new().build_aggregations(&request, &model);
    assert!(!aggs.contains_key("descriptions"));
    assert!(aggs.contains_key("colors"));

    // Even if the engine sent something back under that key
    let response = raw(json!({
        "descriptions": {"buckets": [{"key": "x", "doc_count": 1}]},
        "colors": {"buckets": [{"key": "red", "doc_count": 4}]}
    }));
    let parsed = FacetSynthesizer::new()
        .parse_aggregations(&response, &request, &model)
        .unwrap();
    assert!(!parsed.contains_key("descriptions"));
    assert_eq!(parsed.get("colors").unwrap().len(), 1);
}

#[test]
fn test_unknown_field_facet_is_dropped() {
    let request = FacetRequest::new().facet("ghost", "nonexistent", 5);
    let aggs = FacetSynthesizer::new().build_aggregations(&request, &products_model());
    assert!(aggs.is_empty());
}

#[test]
fn test_flat_and_exact_subfield_aggregations() {
    let request = FacetRequest::new()
        .facet("colors", "color", 5)
        .facet("titles", "title", 0)
        .facet("prices", "price", 3);

    let aggs = FacetSynthesizer::new().build_aggregations(&request, &products_model());
    assert_eq!(
        serde_json::to_value(&aggs).unwrap(),
        json!({
            "colors": {"terms": {"field": "color", "size": 5}},
            "prices": {"terms": {"field": "price", "size": 3}},
            "titles": {"terms": {"field": "title.keyword"}}
        })
    );
}

#[test]
fn test_nested_aggregation_envelope() {
    let request = FacetRequest::new().facet("sizes", "variants.size", 20);
    let aggs = FacetSynthesizer::new().build_aggregations(&request, &products_model());

    assert_eq!(
        serde_json::to_value(&aggs["sizes"]).unwrap(),
        json!({
            "nested": {"path": "variants"},
            "aggs": {
                "facet_values": {"terms": {"field": "variants.size", "size": 20}}
            }
        })
    );
}

#[test]
fn test_round_trip_flattens_nested_and_flat() {
    let model = products_model();
    let request = FacetRequest::new()
        .facet("sizes", "variants.size", 20)
        .facet("colors", "color", 5);

    let response = raw(json!({
        "sizes": {
            "doc_count": 12,
            "facet_values": {
                "doc_count_error_upper_bound": 0,
                "sum_other_doc_count": 0,
                "buckets": [
                    {"key": "M", "doc_count": 7},
                    {"key": "XL", "doc_count": 5}
                ]
            }
        },
        "colors": {
            "buckets": [{"key": "red", "doc_count": 4}]
        },
        "unrequested": {"buckets": []}
    }));

    let parsed = FacetSynthesizer::new()
        .parse_aggregations(&response, &request, &model)
        .unwrap();

    assert_eq!(
        parsed.get("sizes").unwrap(),
        &[
            FacetBucket { value: json!("M"), doc_count: 7 },
            FacetBucket { value: json!("XL"), doc_count: 5 },
        ]
    );
    assert_eq!(
        parsed.get("colors").unwrap(),
        &[FacetBucket { value: json!("red"), doc_count: 4 }]
    );
    assert!(!parsed.contains_key("unrequested"));

    // Keys serialize flat under facet_data
    let encoded = serde_json::to_value(&parsed).unwrap();
    assert_eq!(encoded["facet_data"]["sizes"][1]["value"], "XL");
}

#[test]
fn test_numeric_bucket_keys_survive() {
    let request = FacetRequest::new().facet("prices", "price", 0);
    let response = raw(json!({
        "prices": {"buckets": [{"key": 1999, "doc_count": 2}]}
    }));

    let parsed = FacetSynthesizer::new()
        .parse_aggregations(&response, &request, &products_model())
        .unwrap();
    assert_eq!(parsed.get("prices").unwrap()[0].value, json!(1999));
}

#[test]
fn test_missing_requested_key_is_skipped() {
    let request = FacetRequest::new().facet("colors", "color", 5);
    let parsed = FacetSynthesizer::new()
        .parse_aggregations(&BTreeMap::new(), &request, &products_model())
        .unwrap();
    assert!(parsed.facets.is_empty());
}

#[test]
fn test_shape_mismatch_is_decode_error() {
    let request = FacetRequest::new().facet("sizes", "variants.size", 5);
    // Flat buckets where a nested scope was expected
    let response = raw(json!({
        "sizes": {"buckets": [{"key": "M", "doc_count": 1}]}
    }));

    let err = FacetSynthesizer::new()
        .parse_aggregations(&response, &request, &products_model())
        .unwrap_err();
    assert!(matches!(err, Error::Engine(EngineError::Decode(_))));
}
