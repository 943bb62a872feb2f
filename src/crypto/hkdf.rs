//! # Key Derivation (HKDF)
//!
//! RFC 5869 extract-and-expand key derivation behind a small façade. SHA-256
//! is the default hash; SHA-1 remains available for containers and peers that
//! still derive with it. Every derived buffer is zeroized on drop.

use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::errors::{Error, Result};

/// Hash function underlying extraction and expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256, the default for all new derivations
    #[default]
    Sha256,
    /// SHA-1, kept for legacy derivations only
    Sha1,
}

impl HashAlgorithm {
    /// Digest length in bytes, which is also the PRK length
    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha1 => 20,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha1 => "sha1",
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pseudorandom key produced by [`KeyDerivation::extract`].
///
/// Tagged with the algorithm that produced it so it cannot be expanded under
/// a different hash by mistake. The bytes are zeroized on drop and never
/// appear in `Debug` output.
pub struct DerivedKey {
    algorithm: HashAlgorithm,
    bytes: Zeroizing<Vec<u8>>,
}

impl DerivedKey {
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Raw PRK bytes, exactly one digest length long
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("algorithm", &self.algorithm)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// RFC 5869 HKDF over a fixed hash algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyDerivation {
    algorithm: HashAlgorithm,
}

impl KeyDerivation {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Extract a pseudorandom key from input keying material.
    ///
    /// An absent salt is equivalent to a salt of `output_len` zero bytes,
    /// exactly as the RFC prescribes.
    pub fn extract(&self, salt: Option<&[u8]>, ikm: &[u8]) -> DerivedKey {
        let bytes = match self.algorithm {
            HashAlgorithm::Sha256 => {
                let (prk, _) = Hkdf::<Sha256>::extract(salt, ikm);
                Zeroizing::new(prk.to_vec())
            }
            HashAlgorithm::Sha1 => {
                let (prk, _) = Hkdf::<Sha1>::extract(salt, ikm);
                Zeroizing::new(prk.to_vec())
            }
        };
        DerivedKey { algorithm: self.algorithm, bytes }
    }

    /// Expand a PRK into `output_len` bytes of output keying material.
    ///
    /// `output_len` must be between 1 and 255 digest lengths. The PRK must
    /// have been extracted under this instance's algorithm.
    pub fn expand(
        &self,
        prk: &DerivedKey,
        info: Option<&[u8]>,
        output_len: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        if prk.algorithm != self.algorithm {
            return Err(Error::invalid_argument(format!(
                "PRK was derived with {}, expected {}",
                prk.algorithm, self.algorithm
            )));
        }
        if output_len < 1 {
            return Err(Error::invalid_argument("output length must be at least 1 byte"));
        }
        let max = 255 * self.algorithm.output_len();
        if output_len > max {
            return Err(Error::invalid_argument(format!(
                "output length must be at most {} bytes for {}, got {}",
                max, self.algorithm, output_len
            )));
        }

        let mut okm = Zeroizing::new(vec![0u8; output_len]);
        match self.algorithm {
            HashAlgorithm::Sha256 => {
                let hk = Hkdf::<Sha256>::from_prk(prk.as_bytes()).map_err(|_| {
                    Error::invalid_argument(format!(
                        "PRK length does not match {} output",
                        self.algorithm
                    ))
                })?;
                hk.expand(info.unwrap_or(&[]), &mut okm).map_err(|_| {
                    Error::invalid_argument(format!("cannot expand to {} bytes", output_len))
                })?;
            }
            HashAlgorithm::Sha1 => {
                let hk = Hkdf::<Sha1>::from_prk(prk.as_bytes()).map_err(|_| {
                    Error::invalid_argument(format!(
                        "PRK length does not match {} output",
                        self.algorithm
                    ))
                })?;
                hk.expand(info.unwrap_or(&[]), &mut okm).map_err(|_| {
                    Error::invalid_argument(format!("cannot expand to {} bytes", output_len))
                })?;
            }
        }
        Ok(okm)
    }

    /// Generate a random salt of one digest length
    pub fn random_salt(&self) -> Zeroizing<Vec<u8>> {
        let mut salt = Zeroizing::new(vec![0u8; self.algorithm.output_len()]);
        OsRng.fill_bytes(&mut salt);
        salt
    }
}
