//! # Cryptographic Primitives
//!
//! The primitives everything else is built from: constant-time comparison,
//! RFC 5869 key derivation, authenticated cookie sealing, per-secret content
//! encryption, and row integrity HMACs.

pub mod cipher;
pub mod content;
pub mod hkdf;
pub mod row_hmac;
pub mod subtle;

pub use cipher::CookieCipher;
pub use content::{ContentCryptographer, SealedContent};
pub use hkdf::{DerivedKey, HashAlgorithm, KeyDerivation};
pub use row_hmac::RowHmacGenerator;
pub use subtle::{secure_compare, secure_compare_str};
