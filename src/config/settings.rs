//! # Configuration Settings
//!
//! Defines the configuration structure for the keyplane trust core. The
//! embedding service deserializes these from its own configuration source and
//! calls [`CryptoConfig::validate`] before handing them to the constructors
//! in `auth`, `crypto`, and `rotation`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use validator::Validate;
use zeroize::Zeroizing;

use crate::auth::cookie::SameSitePolicy;
use crate::crypto::cipher;
use crate::crypto::hkdf::HashAlgorithm;
use crate::errors::{Error, Result};
use crate::secrets::SecretString;

/// Top-level configuration for the trust core
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct CryptoConfig {
    /// Session cookie sealing configuration
    #[validate(nested)]
    pub session: SessionConfig,

    /// Cross-site request forgery protection configuration
    #[validate(nested)]
    pub xsrf: XsrfConfig,

    /// Certificate rotation configuration, absent when rotation is not used
    #[validate(nested)]
    pub rotation: Option<RotationConfig>,

    /// Secret content encryption configuration, absent when content
    /// encryption is handled elsewhere
    #[validate(nested)]
    pub content: Option<ContentConfig>,
}

impl CryptoConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        // Use validator crate for basic validation
        Validate::validate(self).map_err(Error::from)?;

        // Custom validation logic
        self.validate_custom()?;

        Ok(())
    }

    /// Custom validation logic that goes beyond what the validator crate can do
    fn validate_custom(&self) -> Result<()> {
        // The session key must decode before anything else is worth checking.
        self.session.decode_key().map(|_| ())?;

        if self.xsrf.cookie.http_only {
            return Err(Error::config(
                "XSRF cookie cannot be HttpOnly; scripts must read it to echo the header",
            ));
        }

        if self.session.cookie.name == self.xsrf.cookie.name {
            return Err(Error::config("Session and XSRF cookies cannot share a name"));
        }

        if let Some(content) = &self.content {
            content.decode_base_key().map(|_| ())?;
        }

        Ok(())
    }
}

/// Session cookie sealing configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionConfig {
    /// Base64-encoded 256-bit key sealing session cookies.
    ///
    /// The default is a development key; production deployments must supply
    /// their own.
    pub encryption_key: SecretString,

    /// Attributes stamped onto issued session cookies
    #[validate(nested)]
    pub cookie: CookieConfig,

    /// Session lifetime in minutes
    #[validate(range(
        min = 1,
        max = 10080,
        message = "Session TTL must be between 1 minute and 7 days"
    ))]
    pub ttl_minutes: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            // "keyplane-dev-only-session-key-00", 32 bytes
            encryption_key: SecretString::new("a2V5cGxhbmUtZGV2LW9ubHktc2Vzc2lvbi1rZXktMDA="),
            cookie: CookieConfig::default(),
            ttl_minutes: 1440, // 24 hours
        }
    }
}

impl SessionConfig {
    /// Decode the configured key, checking it is exactly 256 bits
    pub fn decode_key(&self) -> Result<Zeroizing<Vec<u8>>> {
        let bytes = STANDARD
            .decode(self.encryption_key.expose_secret())
            .map_err(|_| Error::config("session encryption key is not valid base64"))?;
        if bytes.len() != cipher::KEY_BYTES {
            return Err(Error::config(format!(
                "session encryption key must decode to {} bytes, got {}",
                cipher::KEY_BYTES,
                bytes.len()
            )));
        }
        Ok(Zeroizing::new(bytes))
    }

    /// Get the session lifetime as a chrono Duration
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.ttl_minutes)
    }
}

/// Attributes for an issued cookie
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CookieConfig {
    /// Cookie name
    #[validate(length(min = 1, message = "Cookie name cannot be empty"))]
    pub name: String,

    /// Cookie domain, omitted from the header when absent
    pub domain: Option<String>,

    /// Cookie path
    #[validate(length(min = 1, message = "Cookie path cannot be empty"))]
    pub path: String,

    /// Only send over HTTPS
    pub secure: bool,

    /// Hide from client-side scripts
    pub http_only: bool,

    /// SameSite policy
    pub same_site: SameSitePolicy,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "session".to_string(),
            domain: None,
            path: "/".to_string(),
            secure: true,
            http_only: true,
            same_site: SameSitePolicy::Strict,
        }
    }
}

/// Cross-site request forgery protection configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct XsrfConfig {
    /// Attributes for the XSRF token cookie.
    ///
    /// `http_only` must stay false: browsers echo the token back in a header
    /// that client-side code reads from this cookie.
    #[validate(nested)]
    pub cookie: CookieConfig,

    /// Request header carrying the echoed token
    #[validate(length(min = 1, message = "XSRF header name cannot be empty"))]
    pub header_name: String,

    /// Paths exempt from XSRF checks, matched exactly
    pub excluded_paths: Vec<String>,
}

impl Default for XsrfConfig {
    fn default() -> Self {
        Self {
            cookie: CookieConfig {
                name: "XSRF-TOKEN".to_string(),
                http_only: false,
                ..CookieConfig::default()
            },
            header_name: "X-XSRF-TOKEN".to_string(),
            excluded_paths: vec!["/admin/login".to_string(), "/admin/logout".to_string()],
        }
    }
}

/// Certificate rotation configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RotationConfig {
    /// Candidate keystore passwords, tried in order.
    ///
    /// The first password that opens a container wins, so when one password
    /// happens to open a container meant for another, order decides.
    #[validate(length(min = 1, message = "At least one keystore password is required"))]
    pub passwords: Vec<SecretString>,

    /// Path to the PEM file holding the certificate being retired
    #[validate(length(min = 1, message = "Old certificate path cannot be empty"))]
    pub old_certificate: String,

    /// Path to the PEM file holding the replacement certificate
    #[validate(length(min = 1, message = "New certificate path cannot be empty"))]
    pub new_certificate: String,
}

/// Secret content encryption configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ContentConfig {
    /// Base64-encoded base key content keys are derived from. At least 128
    /// bits once decoded; the default is a development key.
    pub base_key: SecretString,

    /// Hash algorithm for key derivation
    pub hash: HashAlgorithm,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            // "keyplane-dev-only-content-key-00", 32 bytes
            base_key: SecretString::new("a2V5cGxhbmUtZGV2LW9ubHktY29udGVudC1rZXktMDA="),
            hash: HashAlgorithm::default(),
        }
    }
}

impl ContentConfig {
    /// Decode the configured base key, checking the minimum length
    pub fn decode_base_key(&self) -> Result<Zeroizing<Vec<u8>>> {
        let bytes = STANDARD
            .decode(self.base_key.expose_secret())
            .map_err(|_| Error::config("content base key is not valid base64"))?;
        if bytes.len() < 16 {
            return Err(Error::config(format!(
                "content base key must decode to at least 16 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Zeroizing::new(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = CryptoConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_session_key_decodes() {
        let key = SessionConfig::default().decode_key().unwrap();
        assert_eq!(key.len(), 32);
    }

    #[test]
    fn test_session_ttl_accessor() {
        let config = SessionConfig { ttl_minutes: 90, ..Default::default() };
        assert_eq!(config.ttl(), chrono::Duration::minutes(90));
    }

    #[test]
    fn test_session_ttl_bounds() {
        let config = CryptoConfig {
            session: SessionConfig { ttl_minutes: 0, ..Default::default() },
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CryptoConfig {
            session: SessionConfig { ttl_minutes: 10081, ..Default::default() },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_session_keys() {
        let config = CryptoConfig {
            session: SessionConfig {
                encryption_key: SecretString::new("not base64!!"),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("base64"));

        let config = CryptoConfig {
            session: SessionConfig {
                // "too short" is only 9 bytes
                encryption_key: SecretString::new(STANDARD.encode("too short")),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("32 bytes"));
    }

    #[test]
    fn test_rejects_empty_cookie_name() {
        let config = CryptoConfig {
            session: SessionConfig {
                cookie: CookieConfig { name: String::new(), ..Default::default() },
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_http_only_xsrf_cookie() {
        let mut config = CryptoConfig::default();
        config.xsrf.cookie.http_only = true;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("HttpOnly"));
    }

    #[test]
    fn test_rejects_shared_cookie_name() {
        let mut config = CryptoConfig::default();
        config.xsrf.cookie.name = "session".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("share a name"));
    }

    #[test]
    fn test_rejects_empty_password_list() {
        let config = CryptoConfig {
            rotation: Some(RotationConfig {
                passwords: vec![],
                old_certificate: "/etc/keyplane/old.pem".to_string(),
                new_certificate: "/etc/keyplane/new.pem".to_string(),
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_short_content_key() {
        let config = CryptoConfig {
            content: Some(ContentConfig {
                base_key: SecretString::new(STANDARD.encode("short")),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("16 bytes"));
    }

    #[test]
    fn test_deserializes_from_json() {
        let json = r#"{
            "session": {
                "encryption_key": "a2V5cGxhbmUtZGV2LW9ubHktc2Vzc2lvbi1rZXktMDA=",
                "cookie": {
                    "name": "session",
                    "domain": "example.com",
                    "path": "/",
                    "secure": true,
                    "http_only": true,
                    "same_site": "strict"
                },
                "ttl_minutes": 60
            },
            "xsrf": {
                "cookie": {
                    "name": "XSRF-TOKEN",
                    "domain": null,
                    "path": "/",
                    "secure": true,
                    "http_only": false,
                    "same_site": "strict"
                },
                "header_name": "X-XSRF-TOKEN",
                "excluded_paths": ["/admin/login"]
            },
            "rotation": null,
            "content": null
        }"#;
        let config: CryptoConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.ttl_minutes, 60);
        assert_eq!(config.session.cookie.domain.as_deref(), Some("example.com"));

        // Secrets never round-trip out of serialization.
        let rendered = serde_json::to_string(&config).unwrap();
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("a2V5cGxhbmUt"));
    }
}
