//! # Duramap Codec
//!
//! The [`Value`] model stored in a Duramap and its deterministic encoding.
//!
//! Values are written as canonical CBOR:
//! - Identical values produce identical bytes
//! - Map keys are sorted (length-first, then bytewise)
//! - Integers use the shortest encoding
//! - Floats are always IEEE-754 doubles
//! - No indefinite-length items
//!
//! ## Usage
//!
//! ```
//! use duramap_codec::{from_cbor, to_canonical_cbor, Value};
//!
//! let value = Value::map([("name", Value::from("Alice")), ("age", Value::from(30))]);
//! let bytes = to_canonical_cbor(&value);
//!
//! let decoded = from_cbor(&bytes).unwrap();
//! assert_eq!(value, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::{from_cbor, CanonicalDecoder};
pub use encoder::{to_canonical_cbor, CanonicalEncoder};
pub use error::{CodecError, CodecResult};
pub use value::Value;

/// Trait for types that can be encoded to canonical CBOR.
pub trait Encode {
    /// Encode this value to canonical CBOR bytes.
    fn encode(&self) -> Vec<u8>;
}

/// Trait for types that can be decoded from CBOR.
pub trait Decode: Sized {
    /// Decode this value from CBOR bytes.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

impl Encode for Value {
    fn encode(&self) -> Vec<u8> {
        to_canonical_cbor(self)
    }
}

impl Decode for Value {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        from_cbor(bytes)
    }
}
