//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Value};

use ahin_kernel_core::{Digest, DigestAlgorithm, Event, Hasher, PayloadEncoding};

/// Generate a random Digest.
pub fn digest() -> impl Strategy<Value = Digest> {
    any::<[u8; 32]>().prop_map(Digest::from_bytes)
}

/// Generate an ordered leaf list of `1..=max_len` digests.
pub fn leaves(max_len: usize) -> impl Strategy<Value = Vec<Digest>> {
    prop::collection::vec(digest(), 1..=max_len)
}

/// Generate a leaf list together with a valid index into it.
pub fn leaves_with_index(max_len: usize) -> impl Strategy<Value = (Vec<Digest>, usize)> {
    leaves(max_len).prop_flat_map(|ls| {
        let len = ls.len();
        (Just(ls), 0..len)
    })
}

/// Generate a supported digest algorithm.
pub fn digest_algorithm() -> impl Strategy<Value = DigestAlgorithm> {
    prop_oneof![
        Just(DigestAlgorithm::Keccak256),
        Just(DigestAlgorithm::Blake3),
        Just(DigestAlgorithm::Sha256),
    ]
}

/// Generate a JSON value of bounded depth and width.
pub fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 _:-]{0,16}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Generate a JSON object payload, serialized with arbitrary key order.
pub fn json_payload() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::btree_map("[a-z]{1,6}", json_value(), 1..6).prop_map(|m| {
        // Reverse insertion order so the input is never already canonical.
        let body: Vec<String> = m
            .iter()
            .rev()
            .map(|(k, v)| format!("{}: {}", Value::String(k.clone()), v))
            .collect();
        format!("{{ {} }}", body.join(", ")).into_bytes()
    })
}

/// Generate a non-empty raw payload.
pub fn raw_payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=max_len)
}

/// Generate a batch of JSON events under `hasher`.
pub fn events(hasher: Hasher, max_len: usize) -> impl Strategy<Value = Vec<Event>> {
    prop::collection::vec(json_payload(), 1..=max_len).prop_map(move |payloads| {
        payloads
            .iter()
            .map(|p| {
                Event::new(&hasher, PayloadEncoding::Json, p, usize::MAX, 0)
                    .expect("generated payloads are valid JSON")
            })
            .collect()
    })
}
