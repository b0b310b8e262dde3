//! Element codec tests

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tabula_foundation::codec::{decode, encode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Sample {
    label: String,
    weights: Vec<f64>,
    tags: BTreeMap<String, u32>,
}

#[test]
fn user_structs_survive_encoding() {
    let sample = Sample {
        label: "doc-1".into(),
        weights: vec![0.25, 0.5],
        tags: BTreeMap::from([("sports".into(), 3)]),
    };
    let back: Sample = decode(&encode(&sample).unwrap()).unwrap();
    assert_eq!(back, sample);
}

#[test]
fn truncated_bytes_fail_to_decode() {
    let bytes = encode(&"a fairly long string value").unwrap();
    assert!(decode::<String>(&bytes[..bytes.len() / 2]).is_err());
}
