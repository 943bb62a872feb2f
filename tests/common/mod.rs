//! Shared certificate fixtures for integration tests.
//!
//! Builds a small ephemeral PKI: a root, two sibling intermediates (the one
//! being retired and its replacement), and a leaf issued by the retired
//! intermediate. Rotation tests swap the intermediates inside keystores that
//! carry the leaf's chain.

use anyhow::{Context, Result};
use rcgen::{BasicConstraints, Certificate, CertificateParams, DnType, IsCa, KeyPair, SerialNumber};

/// One certificate in both encodings the tests need
pub struct TestCert {
    pub pem: String,
    pub der: Vec<u8>,
}

impl TestCert {
    fn from_rcgen(cert: &Certificate) -> Self {
        Self { pem: cert.pem(), der: cert.der().as_ref().to_vec() }
    }
}

/// An ephemeral certificate hierarchy for rotation tests
pub struct TestPki {
    pub root: TestCert,
    pub old_intermediate: TestCert,
    pub new_intermediate: TestCert,
    /// Leaf issued by the old intermediate
    pub leaf: TestCert,
    /// PKCS8 DER of the leaf private key
    pub leaf_key_der: Vec<u8>,
}

impl TestPki {
    pub fn generate() -> Result<Self> {
        let root_key = KeyPair::generate().context("generate root key")?;
        let root_cert =
            ca_params("Keyplane Test Root")?.self_signed(&root_key).context("self-sign root")?;

        let old_key = KeyPair::generate().context("generate old intermediate key")?;
        let old_cert = ca_params("Keyplane Test Intermediate 2024")?
            .signed_by(&old_key, &root_cert, &root_key)
            .context("sign old intermediate")?;

        // The replacement is the same intermediate re-signed by the root:
        // same key pair, same distinguished name, new serial. That is the
        // scenario rotation exists for; a differently named sibling would
        // break the leaf's issuer chain.
        let mut new_params = ca_params("Keyplane Test Intermediate 2024")?;
        new_params.serial_number = Some(SerialNumber::from(vec![0x4b, 0x50, 0x32]));
        let new_cert = new_params
            .signed_by(&old_key, &root_cert, &root_key)
            .context("sign new intermediate")?;

        let leaf_key = KeyPair::generate().context("generate leaf key")?;
        let mut leaf_params = CertificateParams::new(vec!["secrets.example.com".into()])
            .context("build leaf params")?;
        leaf_params.distinguished_name.push(DnType::CommonName, "secrets.example.com");
        let leaf_cert =
            leaf_params.signed_by(&leaf_key, &old_cert, &old_key).context("sign leaf")?;

        Ok(Self {
            root: TestCert::from_rcgen(&root_cert),
            old_intermediate: TestCert::from_rcgen(&old_cert),
            new_intermediate: TestCert::from_rcgen(&new_cert),
            leaf: TestCert::from_rcgen(&leaf_cert),
            leaf_key_der: leaf_key.serialize_der(),
        })
    }
}

fn ca_params(common_name: &str) -> Result<CertificateParams> {
    let mut params = CertificateParams::new(Vec::<String>::new()).context("build CA params")?;
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.distinguished_name.push(DnType::CommonName, common_name);
    params.distinguished_name.push(DnType::OrganizationName, "Keyplane");
    Ok(params)
}
