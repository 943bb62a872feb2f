//! # Authenticated Cookie Cipher
//!
//! AES-256-GCM sealing for session cookie payloads. Sealed blobs are laid out
//! as `nonce || ciphertext || tag` with a fresh 96-bit random nonce per call
//! and a 128-bit authentication tag. Decryption failures are reported as a
//! single [`Error::BadTag`] regardless of what actually went wrong, so a
//! caller probing with forged blobs learns nothing from the error.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::errors::{Error, Result};

/// AES-256 key length in bytes
pub const KEY_BYTES: usize = 32;
/// GCM nonce length in bytes
pub const NONCE_BYTES: usize = 12;
/// GCM authentication tag length in bytes
pub const TAG_BYTES: usize = 16;

/// Authenticated encryption for opaque cookie payloads.
pub struct CookieCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for CookieCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieCipher").finish_non_exhaustive()
    }
}

impl CookieCipher {
    /// Build a cipher from exactly [`KEY_BYTES`] bytes of key material.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_BYTES {
            return Err(Error::config(format!(
                "encryption key must be {} bytes, got {}",
                KEY_BYTES,
                key.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| Error::config(format!("encryption key must be {} bytes", KEY_BYTES)))?;
        Ok(Self { cipher })
    }

    /// Seal a plaintext into `nonce || ciphertext || tag`.
    ///
    /// Each call draws a fresh random nonce, so sealing the same plaintext
    /// twice yields different blobs.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_BYTES];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| Error::invalid_argument("plaintext too large to seal"))?;

        let mut sealed = Vec::with_capacity(NONCE_BYTES + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Open a sealed blob, verifying its authentication tag.
    ///
    /// Truncated input and tag mismatch both come back as [`Error::BadTag`].
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_BYTES + TAG_BYTES {
            return Err(Error::BadTag);
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_BYTES);
        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| Error::BadTag)
    }

    /// The nonce prefix of a sealed blob, if the blob is long enough to have one
    pub fn nonce(sealed: &[u8]) -> Option<&[u8]> {
        if sealed.len() < NONCE_BYTES + TAG_BYTES {
            return None;
        }
        sealed.get(..NONCE_BYTES)
    }
}
