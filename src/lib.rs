//! # Keyplane
//!
//! Keyplane is the cryptographic trust core of a secrets-management service:
//! key derivation, tamper-evident session credentials, cross-site request
//! forgery defense, certificate rotation across keystore formats, and
//! randomized secret generation.
//!
//! ## Architecture
//!
//! The crate is a synchronous library with no I/O of its own; the embedding
//! service owns HTTP, storage, and configuration loading:
//!
//! ```text
//! HTTP Resource Layer → auth filters → sealed session / XSRF cookies
//!          ↓                  ↓                  ↓
//!   Configuration      crypto primitives   rotation / secrets
//! ```
//!
//! ## Core Components
//!
//! - **crypto**: constant-time comparison, RFC 5869 HKDF, AES-256-GCM cookie
//!   sealing, per-secret content encryption, row integrity HMACs
//! - **auth**: session cookie issue/validate, XSRF token derivation, request
//!   filters behind framework-free request/response traits
//! - **rotation**: certificate substitution in PEM, PKCS12, and JCEKS/JKS
//!   keystores
//! - **secrets**: redacting secret wrappers and the secret template compiler
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use keyplane::auth::{CookieAuthenticator, SessionCookieFactory, User};
//! use keyplane::config::SessionConfig;
//!
//! # fn main() -> keyplane::Result<()> {
//! let config = SessionConfig::default();
//! let factory = SessionCookieFactory::from_config(&config)?;
//! let cookie = factory.session_cookie(&User::named("alice"), Utc::now() + config.ttl())?;
//!
//! let authenticator = CookieAuthenticator::from_config(&config)?;
//! assert_eq!(authenticator.authenticate(&cookie.value).unwrap().username, "alice");
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod rotation;
pub mod secrets;

// Re-export commonly used types and traits
pub use config::CryptoConfig;
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "keyplane");
    }
}
