//! Per-value encryption for Duramap.
//!
//! Encrypted maps seal every stored record independently, so the nonces of
//! unrelated keys never depend on each other.
//!
//! ## Security Model
//!
//! - Uses XChaCha20-Poly1305 for authenticated encryption
//! - A fresh random 24-byte nonce per record, prepended to the ciphertext
//! - Keys are zeroized on drop and never logged; only a fingerprint is
//! - Key derivation uses HKDF when deriving from passwords
//!
//! ## Usage
//!
//! ```
//! use duramap_core::{Cipher, SecretKey};
//!
//! let key = SecretKey::generate();
//! let cipher = Cipher::new(&key);
//!
//! let ciphertext = cipher.encrypt(b"secret data").unwrap();
//! let plaintext = cipher.decrypt(&ciphertext).unwrap();
//! assert_eq!(plaintext, b"secret data");
//! ```

mod cipher;

pub use cipher::{Cipher, SecretKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
