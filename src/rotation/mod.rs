//! # Certificate Rotation
//!
//! Replaces one certificate with another across the keystore formats a fleet
//! actually contains: PEM bundles, PKCS12 containers, and JCEKS/JKS
//! containers. Matching is DER equality against the configured old
//! certificate; nothing is inferred from subjects, keys, or expiry.
//!
//! [`CertificateRotator::process`] returns `Ok(None)` when a keystore holds
//! nothing to rotate, which callers treat as "leave the file alone". Running
//! the rotation twice is therefore safe: the second pass finds the old
//! certificate gone and changes nothing.

use std::fs;
use std::path::Path;

use p12_keystore::{
    Certificate as P12Certificate, KeyStore as P12KeyStore, KeyStoreEntry, PrivateKeyChain,
};
use ::pem::{EncodeConfig, LineEnding, Pem};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use x509_parser::prelude::*;

use crate::config::settings::RotationConfig;
use crate::errors::{Error, Result};
use crate::secrets::SecretString;

pub mod jceks;

use jceks::{JceksEntryData, JceksKeyStore};

const BEGIN_CERT: &str = "-----BEGIN CERTIFICATE-----";
const END_CERT: &str = "-----END CERTIFICATE-----";

/// Keystore container formats the rotator understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeystoreFormat {
    Pem,
    Pkcs12,
    Jceks,
}

impl KeystoreFormat {
    /// Guess the format from a file extension, the way operators name these
    /// files in practice
    pub fn from_path(path: impl AsRef<Path>) -> Option<KeystoreFormat> {
        let extension = path.as_ref().extension()?.to_str()?;
        match extension.to_ascii_lowercase().as_str() {
            "pem" | "crt" => Some(KeystoreFormat::Pem),
            "p12" | "pfx" => Some(KeystoreFormat::Pkcs12),
            "jceks" | "jks" => Some(KeystoreFormat::Jceks),
            _ => None,
        }
    }
}

/// Substitutes a configured old certificate with its replacement inside
/// keystores, preserving everything else.
#[derive(Debug)]
pub struct CertificateRotator {
    old_der: Vec<u8>,
    new_der: Vec<u8>,
    new_pem_block: String,
    passwords: Vec<SecretString>,
}

impl CertificateRotator {
    /// Build a rotator from the old and new certificates as PEM text, plus
    /// the ordered candidate passwords for encrypted containers.
    pub fn new(old_pem: &str, new_pem: &str, passwords: Vec<SecretString>) -> Result<Self> {
        if passwords.is_empty() {
            return Err(Error::config("at least one keystore password is required"));
        }
        let old_der = decode_single_certificate(old_pem, "old")?;
        let new_der = decode_single_certificate(new_pem, "new")?;

        // Parse both up front so a bad configuration fails here, not halfway
        // through a fleet of keystores.
        let (_, old_cert) = X509Certificate::from_der(&old_der)
            .map_err(|_| Error::config("old certificate is not valid X.509"))?;
        let (_, new_cert) = X509Certificate::from_der(&new_der)
            .map_err(|_| Error::config("new certificate is not valid X.509"))?;
        info!(
            old_subject = %old_cert.subject(),
            new_subject = %new_cert.subject(),
            "certificate rotator initialized"
        );

        let new_pem_block = ::pem::encode_config(
            &Pem::new("CERTIFICATE", new_der.clone()),
            EncodeConfig::new().set_line_ending(LineEnding::LF),
        );

        Ok(Self { old_der, new_der, new_pem_block, passwords })
    }

    /// Build a rotator reading both certificates from PEM files
    pub fn from_files(
        old_path: impl AsRef<Path>,
        new_path: impl AsRef<Path>,
        passwords: Vec<SecretString>,
    ) -> Result<Self> {
        let old_pem = fs::read_to_string(old_path)?;
        let new_pem = fs::read_to_string(new_path)?;
        Self::new(&old_pem, &new_pem, passwords)
    }

    /// Build a rotator from validated rotation configuration
    pub fn from_config(config: &RotationConfig) -> Result<Self> {
        Self::from_files(&config.old_certificate, &config.new_certificate, config.passwords.clone())
    }

    /// Rotate one keystore.
    ///
    /// Returns the rewritten bytes, or `None` when the container holds no
    /// copy of the old certificate in a position this rotator touches.
    /// Exhausting the password list on an encrypted container is a
    /// configuration error, not a no-op: silently skipping a keystore we
    /// cannot open would leave the fleet half rotated.
    #[instrument(skip_all, fields(format = ?format, len = data.len()))]
    pub fn process(&self, data: &[u8], format: KeystoreFormat) -> Result<Option<Vec<u8>>> {
        match format {
            KeystoreFormat::Pem => self.process_pem(data),
            KeystoreFormat::Pkcs12 => self.process_pkcs12(data),
            KeystoreFormat::Jceks => self.process_jceks(data),
        }
    }

    /// Scan certificate blocks, replacing the matching ones.
    ///
    /// Everything that is not a matching block survives byte for byte:
    /// interstitial commentary, other certificates, even blocks that fail to
    /// parse. Rewriting those would make every rotation a diff of the whole
    /// file instead of a diff of one certificate.
    fn process_pem(&self, data: &[u8]) -> Result<Option<Vec<u8>>> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::keystore("PEM keystore is not valid UTF-8"))?;

        let mut output = String::with_capacity(text.len());
        let mut cursor = 0usize;
        let mut replaced = false;

        while let Some(found) = text[cursor..].find(BEGIN_CERT) {
            let begin = cursor + found;
            let end = match text[begin..].find(END_CERT) {
                Some(offset) => begin + offset + END_CERT.len(),
                // Unterminated block: pass the rest through untouched.
                None => break,
            };
            // Keep the block's own trailing newline with the block.
            let block_end = match text[end..].find('\n') {
                Some(offset) => end + offset + 1,
                None => text.len(),
            };
            let block = &text[begin..block_end];

            match ::pem::parse(block) {
                Ok(parsed) if parsed.tag() == "CERTIFICATE" && parsed.contents() == self.old_der => {
                    output.push_str(&text[cursor..begin]);
                    if block.ends_with('\n') {
                        output.push_str(&self.new_pem_block);
                    } else {
                        output.push_str(self.new_pem_block.trim_end_matches('\n'));
                    }
                    replaced = true;
                }
                _ => output.push_str(&text[cursor..block_end]),
            }
            cursor = block_end;
        }

        if !replaced {
            return Ok(None);
        }
        output.push_str(&text[cursor..]);
        Ok(Some(output.into_bytes()))
    }

    /// Rotate a PKCS12 container.
    ///
    /// Only private-key entries are rewritten; a trusted-certificate entry
    /// matching the old certificate is somebody's trust decision, not this
    /// rotation's business. The container is re-encrypted under the password
    /// that opened it.
    fn process_pkcs12(&self, data: &[u8]) -> Result<Option<Vec<u8>>> {
        let (store, password) = self.open_pkcs12(data)?;

        let mut rotated = P12KeyStore::new();
        let mut changed = false;
        for (alias, entry) in store.entries() {
            match entry {
                KeyStoreEntry::PrivateKeyChain(chain) => {
                    let mut certificates = Vec::new();
                    let mut entry_changed = false;
                    for certificate in chain.chain() {
                        if certificate.as_der() == self.old_der.as_slice() {
                            certificates.push(P12Certificate::from_der(&self.new_der).map_err(
                                |err| {
                                    Error::keystore(format!(
                                        "replacement certificate rejected: {}",
                                        err
                                    ))
                                },
                            )?);
                            entry_changed = true;
                        } else {
                            certificates.push(certificate.clone());
                        }
                    }
                    if entry_changed {
                        changed = true;
                        let rebuilt = PrivateKeyChain::new(
                            chain.key().to_vec(),
                            chain.local_key_id().to_vec(),
                            certificates,
                        );
                        rotated.add_entry(alias, KeyStoreEntry::PrivateKeyChain(rebuilt));
                    } else {
                        rotated.add_entry(alias, entry.clone());
                    }
                }
                other => rotated.add_entry(alias, other.clone()),
            }
        }

        if !changed {
            return Ok(None);
        }
        let output = rotated
            .writer(password.expose_secret())
            .write()
            .map_err(|err| Error::keystore(format!("cannot serialize PKCS12 keystore: {}", err)))?;
        Ok(Some(output))
    }

    fn open_pkcs12<'a>(&'a self, data: &[u8]) -> Result<(P12KeyStore, &'a SecretString)> {
        for password in &self.passwords {
            match P12KeyStore::from_pkcs12(data, password.expose_secret()) {
                Ok(store) => return Ok((store, password)),
                Err(err) => {
                    debug!(error = %err, "candidate password rejected for PKCS12 keystore");
                }
            }
        }
        Err(Error::config("no configured password opens the keystore"))
    }

    /// Rotate a JCEKS/JKS container.
    ///
    /// The structure is parsed before any password is tried, so corrupt
    /// containers fail as keystore errors even when the password list is
    /// also wrong. Encrypted private keys pass through untouched.
    fn process_jceks(&self, data: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut store = JceksKeyStore::parse(data)?;

        let mut opened = None;
        for password in &self.passwords {
            if jceks::verify_integrity(data, password.expose_secret()) {
                opened = Some(password);
                break;
            }
            debug!("candidate password rejected for JCEKS keystore");
        }
        let password =
            opened.ok_or_else(|| Error::config("no configured password opens the keystore"))?;

        let mut changed = false;
        for entry in &mut store.entries {
            if let JceksEntryData::PrivateKey { chain, .. } = &mut entry.data {
                for certificate in chain {
                    if certificate.der == self.old_der {
                        certificate.der = self.new_der.clone();
                        changed = true;
                    }
                }
            }
        }

        if !changed {
            return Ok(None);
        }
        Ok(Some(store.serialize(password.expose_secret())?))
    }
}

fn decode_single_certificate(pem_text: &str, which: &str) -> Result<Vec<u8>> {
    let blocks = ::pem::parse_many(pem_text)
        .map_err(|err| Error::config(format!("{} certificate is not valid PEM: {}", which, err)))?;
    let mut certificates =
        blocks.into_iter().filter(|block| block.tag() == "CERTIFICATE").collect::<Vec<_>>();
    if certificates.len() != 1 {
        return Err(Error::config(format!(
            "{} certificate PEM must contain exactly one CERTIFICATE block, found {}",
            which,
            certificates.len()
        )));
    }
    Ok(certificates.remove(0).contents().to_vec())
}
