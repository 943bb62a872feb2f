//! # Content Encryption
//!
//! Per-secret encryption for stored secret content. Every secret series gets
//! its own AES-256-GCM key, derived from one configured base key with the
//! series name as derivation info, so a leaked per-secret key exposes exactly
//! one secret.
//!
//! Sealed content travels as a JSON envelope of base64 fields
//! (`derivationInfo`, `content`, `iv`) to stay readable by the tooling that
//! already stores envelopes in that shape.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use zeroize::Zeroizing;

use crate::config::settings::ContentConfig;
use crate::crypto::cipher::{CookieCipher, KEY_BYTES, NONCE_BYTES};
use crate::crypto::hkdf::{DerivedKey, HashAlgorithm, KeyDerivation};
use crate::crypto::subtle;
use crate::errors::{Error, Result};

/// Encrypted secret content envelope
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SealedContent {
    /// Name the per-secret key was derived with
    pub derivation_info: String,
    /// Base64 of `ciphertext || tag`
    pub content: String,
    /// Base64 of the GCM nonce
    pub iv: String,
}

impl fmt::Debug for SealedContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedContent")
            .field("derivation_info", &self.derivation_info)
            .field("content", &"[REDACTED]")
            .field("iv", &"[REDACTED]")
            .finish()
    }
}

/// Derives per-secret keys and seals secret content with them.
#[derive(Debug)]
pub struct ContentCryptographer {
    kdf: KeyDerivation,
    prk: DerivedKey,
}

impl ContentCryptographer {
    /// Build from raw base key material, at least 128 bits of it.
    ///
    /// The base key is run through HKDF extraction once here; per-secret
    /// keys are expansions of the resulting PRK.
    pub fn new(base_key: &[u8], algorithm: HashAlgorithm) -> Result<Self> {
        if base_key.len() < 16 {
            return Err(Error::config(format!(
                "content base key must be at least 16 bytes, got {}",
                base_key.len()
            )));
        }
        let kdf = KeyDerivation::new(algorithm);
        let prk = kdf.extract(None, base_key);
        Ok(Self { kdf, prk })
    }

    /// Build from validated content configuration
    pub fn from_config(config: &ContentConfig) -> Result<Self> {
        let key = config.decode_base_key()?;
        Self::new(&key, config.hash)
    }

    /// Derive `output_len` bytes of key material bound to `info`.
    ///
    /// Deterministic for a given base key, so the same secret series always
    /// maps to the same key.
    pub fn derive_key(&self, output_len: usize, info: &str) -> Result<Zeroizing<Vec<u8>>> {
        self.kdf.expand(&self.prk, Some(info.as_bytes()), output_len)
    }

    /// Seal base64-encoded content under the key for `derivation_info`.
    ///
    /// Before returning, the envelope is decrypted again and compared with
    /// the input; a mismatch is logged. Corrupted output discovered here is
    /// recoverable, the same corruption discovered at read time is not.
    #[instrument(skip_all, fields(derivation_info = %derivation_info))]
    pub fn encrypt(&self, derivation_info: &str, content_base64: &str) -> Result<SealedContent> {
        if derivation_info.is_empty() {
            return Err(Error::invalid_argument("derivation info may not be empty"));
        }

        let key = self.derive_key(KEY_BYTES, derivation_info)?;
        let cipher = CookieCipher::new(&key)?;
        let sealed = cipher.encrypt(content_base64.as_bytes())?;
        let (nonce, ciphertext) = sealed.split_at(NONCE_BYTES);

        let envelope = SealedContent {
            derivation_info: derivation_info.to_string(),
            content: STANDARD.encode(ciphertext),
            iv: STANDARD.encode(nonce),
        };

        match self.decrypt(&envelope) {
            Ok(roundtrip) if subtle::secure_compare_str(&roundtrip, content_base64) => {}
            _ => warn!("content self-check failed after encryption"),
        }

        Ok(envelope)
    }

    /// Open a sealed envelope and return the base64-encoded content.
    pub fn decrypt(&self, sealed: &SealedContent) -> Result<String> {
        if sealed.derivation_info.is_empty() {
            return Err(Error::invalid_argument("derivation info may not be empty"));
        }
        let iv = STANDARD
            .decode(&sealed.iv)
            .map_err(|_| Error::invalid_argument("sealed content iv is not valid base64"))?;
        if iv.len() != NONCE_BYTES {
            return Err(Error::invalid_argument(format!(
                "sealed content iv must be {} bytes, got {}",
                NONCE_BYTES,
                iv.len()
            )));
        }
        let ciphertext = STANDARD
            .decode(&sealed.content)
            .map_err(|_| Error::invalid_argument("sealed content is not valid base64"))?;

        let key = self.derive_key(KEY_BYTES, &sealed.derivation_info)?;
        let cipher = CookieCipher::new(&key)?;

        let mut blob = Vec::with_capacity(iv.len() + ciphertext.len());
        blob.extend_from_slice(&iv);
        blob.extend_from_slice(&ciphertext);
        let plaintext = cipher.decrypt(&blob)?;

        String::from_utf8(plaintext)
            .map_err(|_| Error::invalid_argument("decrypted content is not UTF-8"))
    }
}
