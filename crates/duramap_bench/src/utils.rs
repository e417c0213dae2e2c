//! Benchmark utilities.

use duramap_core::{CoreError, Duramap, Value};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Number of filler entries in a populated benchmark map.
pub const ENTRIES: usize = 10_000;

/// Key read and written by the per-operation benchmarks.
pub const HOT_KEY: &str = "foo";

/// Generate random alphanumeric text of exactly `len` bytes.
pub fn random_text(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// The payloads every map benchmark runs with, labelled.
pub fn payloads() -> Vec<(&'static str, Value)> {
    vec![
        ("int64", Value::Integer(123_456_789)),
        ("str64b", Value::Text(random_text(64))),
        ("str128b", Value::Text(random_text(128))),
        ("str256b", Value::Text(random_text(256))),
    ]
}

/// Fills `map` with [`ENTRIES`] copies of `payload` plus [`HOT_KEY`].
pub fn populate(map: &Duramap, payload: &Value) {
    map.update(|tx| {
        tx.set(HOT_KEY, "bar");
        for i in 0..ENTRIES {
            tx.set(format!("thing-{i}"), payload.clone());
        }
        Ok::<_, CoreError>(())
    })
    .expect("Failed to populate benchmark map");
}
