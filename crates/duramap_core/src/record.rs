//! Stored record format.
//!
//! Every mirror entry is stored as one engine record:
//!
//! ```text
//! key   = UTF-8 bytes of the mirror key
//! value = encode({"v": value})                      (plain maps)
//!       = nonce(24) || seal(encode({"v": value}))   (encrypted maps)
//! ```
//!
//! An empty stored value is a tombstone and is skipped on load.

use crate::crypto::Cipher;
use crate::error::{CoreError, CoreResult};
use duramap_codec::{from_cbor, to_canonical_cbor, Value};
use std::collections::BTreeMap;

/// Key of the single entry in a record wrapper.
const WRAPPER_KEY: &str = "v";

/// Encodes a value into stored record bytes.
pub(crate) fn encode_record(value: &Value, cipher: Option<&Cipher>) -> CoreResult<Vec<u8>> {
    let mut wrapper = BTreeMap::new();
    wrapper.insert(WRAPPER_KEY.to_string(), value.clone());
    let bytes = to_canonical_cbor(&Value::Map(wrapper));

    match cipher {
        Some(cipher) => cipher.encrypt(&bytes),
        None => Ok(bytes),
    }
}

/// Decodes stored record bytes.
///
/// Returns `None` for a tombstone.
pub(crate) fn decode_record(
    key: &str,
    bytes: &[u8],
    cipher: Option<&Cipher>,
) -> CoreResult<Option<Value>> {
    if bytes.is_empty() {
        return Ok(None);
    }

    let plain;
    let bytes = match cipher {
        Some(cipher) => {
            plain = cipher.decrypt(bytes).map_err(|e| match e {
                CoreError::Decryption { message } => {
                    CoreError::decryption(format!("record {key:?}: {message}"))
                }
                other => other,
            })?;
            plain.as_slice()
        }
        None => bytes,
    };

    let wrapper = from_cbor(bytes).map_err(|e| CoreError::decode(key, e.to_string()))?;
    match wrapper {
        Value::Map(mut entries) if entries.len() == 1 => entries
            .remove(WRAPPER_KEY)
            .map(Some)
            .ok_or_else(|| CoreError::decode(key, "wrapper has no \"v\" entry")),
        other => Err(CoreError::decode(
            key,
            format!("expected one-entry wrapper map, found {}", other.type_name()),
        )),
    }
}
