//! XChaCha20-Poly1305 record cipher.

use crate::error::{CoreError, CoreResult};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the secret key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the XChaCha20 nonce in bytes.
pub const NONCE_SIZE: usize = 24;
/// Size of the Poly1305 authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// A 256-bit secret for encrypted maps.
///
/// The key is automatically zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; KEY_SIZE],
}

impl SecretKey {
    /// Generates a new random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CoreError::invalid_key_size(bytes.len(), KEY_SIZE));
        }

        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Returns the key as a byte slice.
    ///
    /// # Security
    ///
    /// Don't log or serialize the result.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Derives a key from a password using HKDF-SHA256.
    ///
    /// # Arguments
    ///
    /// * `password` - The password to derive from
    /// * `salt` - A salt unique to the map (should be random and stored)
    ///
    /// # Security Note
    ///
    /// HKDF is a key derivation function, not a password hashing function.
    /// It is appropriate when the input already has high entropy, such as a
    /// generated passphrase.
    pub fn derive_from_password(password: &[u8], salt: &[u8]) -> CoreResult<Self> {
        use hkdf::Hkdf;

        let hk = Hkdf::<Sha256>::new(Some(salt), password);

        let mut bytes = [0u8; KEY_SIZE];
        hk.expand(b"duramap-record-key-v1", &mut bytes)
            .map_err(|_| CoreError::key_derivation("HKDF expand failed"))?;

        Ok(Self { bytes })
    }

    /// Returns a short, non-reversible identifier for this key.
    ///
    /// Two keys have the same fingerprint only if they are equal, so it is
    /// safe to log and to compare.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.bytes);
        hex::encode(&digest[..8])
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("bytes", &"[REDACTED]")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Seals and opens stored records.
///
/// The output of [`encrypt`](Self::encrypt) is
/// `nonce (24 bytes) || ciphertext || tag (16 bytes)`.
pub struct Cipher {
    aead: XChaCha20Poly1305,
}

impl Cipher {
    /// Creates a cipher for the given key.
    #[must_use]
    pub fn new(key: &SecretKey) -> Self {
        let aead = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
        Self { aead }
    }

    /// Encrypts a payload under a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is too large for the cipher.
    pub fn encrypt(&self, plaintext: &[u8]) -> CoreResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .aead
            .encrypt(nonce, plaintext)
            .map_err(|_| CoreError::encryption("payload cannot be sealed"))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend(ciphertext);

        Ok(result)
    }

    /// Decrypts a payload produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Decryption`] if the input is truncated, was
    /// sealed under another key, or has been tampered with. No plaintext is
    /// returned unless the tag verifies.
    pub fn decrypt(&self, ciphertext: &[u8]) -> CoreResult<Vec<u8>> {
        if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CoreError::decryption("ciphertext too short"));
        }

        let (nonce, sealed) = ciphertext.split_at(NONCE_SIZE);
        self.aead
            .decrypt(XNonce::from_slice(nonce), sealed)
            .map_err(|_| CoreError::decryption("authentication failed"))
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher")
            .field("aead", &"XChaCha20Poly1305")
            .finish()
    }
}
