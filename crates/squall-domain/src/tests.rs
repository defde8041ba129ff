use serde_json::{json, Value};

use crate::types::{Payload, PayloadBody, Provenance, Row, VendorTag};

fn row(pairs: &[(&str, Value)]) -> Row {
    let mut r = Row::new();
    for (k, v) in pairs {
        r.insert((*k).to_string(), v.clone());
    }
    r
}

#[test]
fn vendor_fallback_chain_truncates_suffixes() {
    let chain = VendorTag::new("cisco_ios_xe").fallbacks();
    let tags: Vec<&str> = chain.iter().map(|t| t.as_str()).collect();
    assert_eq!(tags, vec!["cisco_ios_xe", "cisco_ios", "cisco"]);
}

#[test]
fn vendor_fallback_chain_single_segment() {
    let chain = VendorTag::new("arista").fallbacks();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].as_str(), "arista");
}

#[test]
fn flat_payload_merges_provenance_keys() {
    let body = PayloadBody::Flat(row(&[("five_sec_total", json!(1.0))]));
    let payload = Payload::new(
        body,
        Provenance {
            parsed_by: "regex".into(),
            template: "inline".into(),
            error: None,
        },
    );

    let v = payload.into_value();
    assert_eq!(v["five_sec_total"], json!(1.0));
    assert_eq!(v["_parsed_by"], json!("regex"));
    assert_eq!(v["_template"], json!("inline"));
    assert!(v.get("_error").is_none());
}

#[test]
fn table_payload_wraps_rows_under_key() {
    let rows = vec![
        row(&[("name", json!("Ethernet1"))]),
        row(&[("name", json!("Ethernet2"))]),
    ];
    let payload = Payload::new(
        PayloadBody::Table {
            key: "interfaces".into(),
            rows,
        },
        Provenance {
            parsed_by: "textfsm".into(),
            template: "t.textfsm".into(),
            error: None,
        },
    );

    let v = payload.into_value();
    assert_eq!(v["interfaces"].as_array().map(Vec::len), Some(2));
    assert_eq!(v["interfaces"][0]["name"], json!("Ethernet1"));
}

#[test]
fn failed_provenance_carries_error() {
    let p = Provenance::none("all parsers failed (regex: 0 matches)");
    assert_eq!(p.parsed_by, "none");
    assert!(p.error.is_some());

    let payload = Payload::new(PayloadBody::empty(), p);
    let v = payload.into_value();
    assert_eq!(v["_parsed_by"], json!("none"));
    assert!(v["_error"].as_str().unwrap().contains("all parsers failed"));
}

#[test]
fn body_accessors_match_shape() {
    let flat = PayloadBody::Flat(row(&[("a", json!(1))]));
    assert!(flat.as_flat().is_some());
    assert!(flat.as_rows().is_none());

    let table = PayloadBody::Table {
        key: "entries".into(),
        rows: vec![],
    };
    assert!(table.as_flat().is_none());
    assert!(table.as_rows().is_some());
    assert!(table.is_empty());
}
