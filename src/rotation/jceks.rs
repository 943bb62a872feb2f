//! # JCEKS/JKS Keystore Codec
//!
//! Reader and writer for the JDK's proprietary keystore container, which has
//! no registry crate. Only the container is decoded: encrypted private keys
//! stay opaque `EncryptedPrivateKeyInfo` blobs, so rewriting a chain never
//! requires a key password and preserves the key bytes exactly.
//!
//! Layout (all integers big-endian):
//!
//! ```text
//! magic (0xCECECECE jceks / 0xFEEDFEED jks), version (2), entry count,
//! entries:
//!   tag 1: alias, timestamp millis, encrypted key blob, certificate chain
//!   tag 2: alias, timestamp millis, one trusted certificate
//!   tag 3: sealed secret key (rejected, requires Java serialization)
//! sha1(password as UTF-16BE || "Mighty Aphrodite" || everything above)
//! ```
//!
//! Strings are a u16 byte length plus Java modified UTF-8 (NUL is the
//! two-byte `C0 80`, supplementary characters are encoded surrogate pairs);
//! blobs are a u32 length plus bytes. The trailing digest doubles as the
//! password check.

use sha1::{Digest, Sha1};

use crate::crypto::subtle;
use crate::errors::{Error, Result};

/// Magic prefix of a JCEKS keystore
pub const JCEKS_MAGIC: u32 = 0xCECE_CECE;
/// Magic prefix of a JKS keystore
pub const JKS_MAGIC: u32 = 0xFEED_FEED;

const VERSION_2: u32 = 2;
const DIGEST_SALT: &[u8] = b"Mighty Aphrodite";
const DIGEST_LEN: usize = 20;

/// A parsed keystore container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JceksKeyStore {
    magic: u32,
    pub entries: Vec<JceksEntry>,
}

/// One aliased keystore entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JceksEntry {
    pub alias: String,
    pub timestamp_millis: i64,
    pub data: JceksEntryData,
}

/// Entry payload variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JceksEntryData {
    /// Tag 1: an encrypted private key with its certificate chain
    PrivateKey { encrypted_key: Vec<u8>, chain: Vec<JceksCertificate> },
    /// Tag 2: a bare trusted certificate
    TrustedCertificate(JceksCertificate),
}

/// A typed certificate blob, virtually always `X.509` DER
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JceksCertificate {
    pub cert_type: String,
    pub der: Vec<u8>,
}

impl JceksKeyStore {
    /// Create an empty keystore with the given magic
    pub fn new(magic: u32) -> Self {
        Self { magic, entries: Vec::new() }
    }

    pub fn magic(&self) -> u32 {
        self.magic
    }

    /// Parse a keystore's structure without touching any password.
    ///
    /// Structural damage surfaces here as [`Error::Keystore`] no matter what
    /// passwords the caller holds; password checking is a separate step via
    /// [`verify_integrity`].
    pub fn parse(data: &[u8]) -> Result<JceksKeyStore> {
        let mut reader = ByteReader::new(data);

        let magic = reader.read_u32()?;
        if magic != JCEKS_MAGIC && magic != JKS_MAGIC {
            return Err(Error::keystore("not a JCEKS or JKS keystore (bad magic)"));
        }
        let version = reader.read_u32()?;
        if version != VERSION_2 {
            return Err(Error::keystore(format!("unsupported keystore version {}", version)));
        }

        let count = reader.read_u32()?;
        let mut entries = Vec::new();
        for _ in 0..count {
            let tag = reader.read_u32()?;
            match tag {
                1 => {
                    let alias = reader.read_utf()?;
                    let timestamp_millis = reader.read_i64()?;
                    let key_len = reader.read_u32()? as usize;
                    let encrypted_key = reader.take(key_len)?.to_vec();
                    let chain_len = reader.read_u32()?;
                    let mut chain = Vec::new();
                    for _ in 0..chain_len {
                        chain.push(read_certificate(&mut reader)?);
                    }
                    entries.push(JceksEntry {
                        alias,
                        timestamp_millis,
                        data: JceksEntryData::PrivateKey { encrypted_key, chain },
                    });
                }
                2 => {
                    let alias = reader.read_utf()?;
                    let timestamp_millis = reader.read_i64()?;
                    let certificate = read_certificate(&mut reader)?;
                    entries.push(JceksEntry {
                        alias,
                        timestamp_millis,
                        data: JceksEntryData::TrustedCertificate(certificate),
                    });
                }
                3 => {
                    // Java-serialized SealedObject; cannot even be skipped
                    // without parsing Java serialization.
                    return Err(Error::keystore("secret key entries are not supported"));
                }
                other => {
                    return Err(Error::keystore(format!("unknown keystore entry tag {}", other)));
                }
            }
        }

        match reader.remaining() {
            DIGEST_LEN => Ok(JceksKeyStore { magic, entries }),
            n if n < DIGEST_LEN => Err(Error::keystore("keystore integrity digest is truncated")),
            _ => Err(Error::keystore("trailing data after keystore digest")),
        }
    }

    /// Serialize the keystore, appending the integrity digest for `password`.
    pub fn serialize(&self, password: &str) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        body.extend_from_slice(&self.magic.to_be_bytes());
        body.extend_from_slice(&VERSION_2.to_be_bytes());
        body.extend_from_slice(&len_u32(self.entries.len())?.to_be_bytes());

        for entry in &self.entries {
            match &entry.data {
                JceksEntryData::PrivateKey { encrypted_key, chain } => {
                    body.extend_from_slice(&1u32.to_be_bytes());
                    write_utf(&mut body, &entry.alias)?;
                    body.extend_from_slice(&entry.timestamp_millis.to_be_bytes());
                    body.extend_from_slice(&len_u32(encrypted_key.len())?.to_be_bytes());
                    body.extend_from_slice(encrypted_key);
                    body.extend_from_slice(&len_u32(chain.len())?.to_be_bytes());
                    for certificate in chain {
                        write_certificate(&mut body, certificate)?;
                    }
                }
                JceksEntryData::TrustedCertificate(certificate) => {
                    body.extend_from_slice(&2u32.to_be_bytes());
                    write_utf(&mut body, &entry.alias)?;
                    body.extend_from_slice(&entry.timestamp_millis.to_be_bytes());
                    write_certificate(&mut body, certificate)?;
                }
            }
        }

        let digest = integrity_digest(password, &body);
        body.extend_from_slice(&digest);
        Ok(body)
    }
}

/// Check whether `password` produces the trailing integrity digest.
pub fn verify_integrity(data: &[u8], password: &str) -> bool {
    if data.len() < DIGEST_LEN {
        return false;
    }
    let (body, digest) = data.split_at(data.len() - DIGEST_LEN);
    subtle::secure_compare(&integrity_digest(password, body), digest)
}

fn integrity_digest(password: &str, body: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha1::new();
    for unit in password.encode_utf16() {
        hasher.update(unit.to_be_bytes());
    }
    hasher.update(DIGEST_SALT);
    hasher.update(body);
    hasher.finalize().into()
}

fn read_certificate(reader: &mut ByteReader<'_>) -> Result<JceksCertificate> {
    let cert_type = reader.read_utf()?;
    let len = reader.read_u32()? as usize;
    let der = reader.take(len)?.to_vec();
    Ok(JceksCertificate { cert_type, der })
}

fn write_certificate(buf: &mut Vec<u8>, certificate: &JceksCertificate) -> Result<()> {
    write_utf(buf, &certificate.cert_type)?;
    buf.extend_from_slice(&len_u32(certificate.der.len())?.to_be_bytes());
    buf.extend_from_slice(&certificate.der);
    Ok(())
}

fn write_utf(buf: &mut Vec<u8>, value: &str) -> Result<()> {
    // Each UTF-16 code unit, surrogates included, is encoded on its own.
    let mut encoded = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007f => encoded.push(unit as u8),
            0x0000 | 0x0080..=0x07ff => {
                encoded.push(0xc0 | (unit >> 6) as u8);
                encoded.push(0x80 | (unit & 0x3f) as u8);
            }
            _ => {
                encoded.push(0xe0 | (unit >> 12) as u8);
                encoded.push(0x80 | ((unit >> 6) & 0x3f) as u8);
                encoded.push(0x80 | (unit & 0x3f) as u8);
            }
        }
    }
    let len = u16::try_from(encoded.len())
        .map_err(|_| Error::keystore("keystore string too long to encode"))?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&encoded);
    Ok(())
}

fn len_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::keystore("keystore entry too large to encode"))
}

struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| Error::keystore("unexpected end of keystore data"))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_i64(&mut self) -> Result<i64> {
        let b = self.take(8)?;
        Ok(i64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    fn read_utf(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        let bytes = self.take(len)?;

        // Decode modified UTF-8 to UTF-16 code units, then let the surrogate
        // pairing fall out of the UTF-16 conversion.
        let bad = || Error::keystore("keystore string is not valid modified UTF-8");
        let mut units = Vec::with_capacity(len);
        let mut i = 0;
        while i < bytes.len() {
            let b0 = bytes[i];
            let unit = match b0 {
                0x00..=0x7f => {
                    i += 1;
                    b0 as u16
                }
                0xc0..=0xdf => {
                    if i + 1 >= bytes.len() || bytes[i + 1] & 0xc0 != 0x80 {
                        return Err(bad());
                    }
                    let unit = ((b0 as u16 & 0x1f) << 6) | (bytes[i + 1] as u16 & 0x3f);
                    i += 2;
                    unit
                }
                0xe0..=0xef => {
                    if i + 2 >= bytes.len()
                        || bytes[i + 1] & 0xc0 != 0x80
                        || bytes[i + 2] & 0xc0 != 0x80
                    {
                        return Err(bad());
                    }
                    let unit = ((b0 as u16 & 0x0f) << 12)
                        | ((bytes[i + 1] as u16 & 0x3f) << 6)
                        | (bytes[i + 2] as u16 & 0x3f);
                    i += 3;
                    unit
                }
                _ => return Err(bad()),
            };
            units.push(unit);
        }
        String::from_utf16(&units).map_err(|_| bad())
    }
}
