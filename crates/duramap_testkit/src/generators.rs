//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that maintains required invariants.

use duramap_core::{Mirror, Value};
use proptest::prelude::*;

/// Strategy for generating map keys.
///
/// Keys are arbitrary non-empty strings, including non-ASCII text.
pub fn key_strategy() -> impl Strategy<Value = String> {
    ".{1,24}"
}

/// Strategy for generating valid map names.
pub fn map_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,31}").expect("Invalid regex")
}

/// Strategy for generating values of every shape, nested up to depth 3.
///
/// NaN is excluded because it never compares equal to itself.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        any::<f64>()
            .prop_filter("NaN never compares equal", |f| !f.is_nan())
            .prop_map(Value::Float),
        ".{0,32}".prop_map(Value::Text),
    ];
    leaf.prop_recursive(3, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map(".{0,8}", inner, 0..6).prop_map(Value::Map),
        ]
    })
}

/// Strategy for generating whole map contents.
pub fn mirror_strategy(max_entries: usize) -> impl Strategy<Value = Mirror> {
    prop::collection::hash_map(key_strategy(), value_strategy(), 0..=max_entries)
}

/// Strategy for generating string values of an exact byte length.
pub fn sized_text_strategy(len: usize) -> impl Strategy<Value = Value> {
    prop::collection::vec(b'a'..=b'z', len)
        .prop_map(|bytes| Value::Text(bytes.into_iter().map(char::from).collect()))
}
