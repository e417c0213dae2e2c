//! Integration tests for encrypted maps.

use duramap_core::crypto::NONCE_SIZE;
use duramap_core::{Config, CoreError, Registry, SecretKey, Value};
use duramap_storage::{InMemoryEngine, StorageEngine, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn shared_memory_registry() -> (Registry, Arc<InMemoryEngine>) {
    let engine = Arc::new(InMemoryEngine::new());
    let shared = Arc::clone(&engine);
    let registry = Registry::with_opener(Config::default(), move |_path: &Path| {
        Ok(Arc::clone(&shared) as Arc<dyn StorageEngine>)
    });
    (registry, engine)
}

#[test]
fn encrypted_roundtrip_on_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("secret.db");
    let key = SecretKey::generate();
    let registry = Registry::new(Config::default());

    let map = registry.open_loaded(&path, "vault", Some(key.clone())).unwrap();
    assert!(map.is_encrypted());
    map.update(|tx| {
        tx.set("token", "s3cr3t");
        tx.set("n", 7);
        Ok::<_, CoreError>(())
    })
    .unwrap();
    let before = map.snapshot();
    map.close().unwrap();

    let reopened = registry.open_loaded(&path, "vault", Some(key)).unwrap();
    assert_eq!(reopened.snapshot(), before);
}

#[test]
fn records_are_sealed_with_fresh_nonces() {
    let (registry, engine) = shared_memory_registry();
    let map = registry
        .open_loaded("x.db", "m", Some(SecretKey::generate()))
        .unwrap();

    map.update(|tx| {
        tx.set("a", "same plaintext");
        tx.set("b", "same plaintext");
        Ok::<_, CoreError>(())
    })
    .unwrap();

    let records = engine.records("m");
    assert_eq!(records.len(), 2);
    let (a, b) = (&records[0].1, &records[1].1);
    assert_ne!(&a[..NONCE_SIZE], &b[..NONCE_SIZE]);
    for (_, stored) in &records {
        assert!(!stored.windows(5).any(|w| w == b"plain"));
    }
}

#[test]
fn wrong_secret_fails_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("secret.db");
    let registry = Registry::new(Config::default());

    let map = registry
        .open_loaded(&path, "vault", Some(SecretKey::generate()))
        .unwrap();
    map.update(|tx| {
        tx.set("k", "v");
        Ok::<_, CoreError>(())
    })
    .unwrap();
    map.close().unwrap();

    let result = registry.open_loaded(&path, "vault", Some(SecretKey::generate()));
    assert!(matches!(result, Err(CoreError::Decryption { .. })));
}

#[test]
fn tampered_record_fails_load_and_keeps_mirror() {
    let (registry, engine) = shared_memory_registry();
    let key = SecretKey::generate();
    let map = registry.open_loaded("x.db", "m", Some(key)).unwrap();
    map.update(|tx| {
        tx.set("k", "original");
        Ok::<_, CoreError>(())
    })
    .unwrap();

    let (raw_key, mut stored) = engine.records("m").remove(0);
    let last = stored.len() - 1;
    stored[last] ^= 0x01;
    let mut batch = WriteBatch::new();
    batch.put(raw_key, stored);
    engine.commit("m", batch).unwrap();

    let err = map.load().unwrap_err();
    assert!(matches!(err, CoreError::Decryption { .. }));
    assert!(err.to_string().starts_with("unable to decrypt"));
    assert_eq!(map.get("k"), Some(Value::from("original")));
}

#[test]
fn plain_record_in_encrypted_map_fails() {
    let (registry, engine) = shared_memory_registry();
    let plain = registry.open_loaded("x.db", "m", None).unwrap();
    plain
        .update(|tx| {
            tx.set("k", "v");
            Ok::<_, CoreError>(())
        })
        .unwrap();
    plain.close().unwrap();
    assert_eq!(engine.records("m").len(), 1);

    let result = registry.open_loaded("x.db", "m", Some(SecretKey::generate()));
    assert!(matches!(result, Err(CoreError::Decryption { .. })));
}

#[test]
fn password_derived_key_reopens() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("secret.db");
    let registry = Registry::new(Config::default());
    let derive = || SecretKey::derive_from_password(b"correct horse", b"salt-1234").unwrap();

    let map = registry.open_loaded(&path, "m", Some(derive())).unwrap();
    map.update(|tx| {
        tx.set("k", 1);
        Ok::<_, CoreError>(())
    })
    .unwrap();
    map.close().unwrap();

    let reopened = registry.open_loaded(&path, "m", Some(derive())).unwrap();
    assert_eq!(reopened.get("k"), Some(Value::from(1)));
}

#[test]
fn secret_conflict_on_live_map() {
    let registry = Registry::in_memory();
    let key = SecretKey::generate();
    let map = registry.open("x.db", "m", Some(key.clone())).unwrap();

    assert!(matches!(
        registry.open("x.db", "m", Some(SecretKey::generate())),
        Err(CoreError::SecretConflict { .. })
    ));
    assert!(matches!(
        registry.open("x.db", "m", None),
        Err(CoreError::SecretConflict { .. })
    ));

    let again = registry.open("x.db", "m", Some(key)).unwrap();
    assert!(Arc::ptr_eq(&map, &again));
    assert_eq!(map.secret_fingerprint(), again.secret_fingerprint());
}
