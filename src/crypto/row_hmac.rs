//! # Row Integrity HMAC
//!
//! Keyed digests over database row identity so an attacker with raw table
//! access cannot quietly swap or forge rows. The key is derived from the
//! content base key under the fixed info string `"row_hmac"`; the storage
//! layer that stores and rechecks these strings lives outside this crate.

use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::crypto::content::ContentCryptographer;
use crate::errors::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Computes uppercase-hex HMAC-SHA-256 integrity strings for rows.
pub struct RowHmacGenerator {
    mac: HmacSha256,
}

impl RowHmacGenerator {
    /// Derive the row HMAC key from the content cryptographer's base key
    pub fn new(cryptographer: &ContentCryptographer) -> Result<Self> {
        let key = cryptographer.derive_key(32, "row_hmac")?;
        let mac = HmacSha256::new_from_slice(&key)
            .map_err(|_| Error::config("row HMAC key has invalid length"))?;
        Ok(Self { mac })
    }

    /// HMAC an arbitrary message, returned as uppercase hex
    pub fn compute_hmac(&self, message: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(message);
        hex::encode_upper(mac.finalize().into_bytes())
    }

    /// HMAC for a row identified by table, name, and numeric id
    pub fn compute_row_hmac(&self, table: &str, name: &str, id: i64) -> String {
        self.compute_hmac(format!("{}|{}|{}", table, name, id).as_bytes())
    }

    /// HMAC for a join-table row relating two numeric ids
    pub fn compute_pair_hmac(&self, table: &str, id1: i64, id2: i64) -> String {
        self.compute_hmac(format!("{}|{}|{}", table, id1, id2).as_bytes())
    }

    /// A uniformly random `i64` for row id generation
    pub fn next_long_secure(&self) -> i64 {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        i64::from_be_bytes(bytes)
    }
}
