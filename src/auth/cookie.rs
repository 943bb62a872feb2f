//! Session cookie management for web-based authentication.
//!
//! This module seals `{user, expiration}` payloads into opaque, authenticated
//! cookie values and validates them on the way back in. The sealed value is
//! `base64(nonce || ciphertext || tag)`; nothing about the session is
//! readable or forgeable without the configured key.
//!
//! Logout is a value, not an operation: [`expired_session_cookie`] issues the
//! fixed sentinel `"expired"` with an epoch expiry, which no honest validation
//! will ever accept.
//!
//! [`expired_session_cookie`]: SessionCookieFactory::expired_session_cookie

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use zeroize::Zeroizing;

use crate::config::settings::{CookieConfig, SessionConfig};
use crate::crypto::cipher::CookieCipher;
use crate::errors::{Error, Result};

/// Sentinel value carried by logout cookies instead of a sealed payload
pub const EXPIRED_SESSION_VALUE: &str = "expired";

/// Format for the `Expires` cookie attribute
const EXPIRES_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// An authenticated principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
}

impl User {
    pub fn named(username: impl Into<String>) -> Self {
        Self { username: username.into() }
    }
}

/// What actually gets sealed into the cookie value
#[derive(Serialize, Deserialize)]
struct SessionPayload {
    user: String,
    expiration: DateTime<Utc>,
}

/// SameSite cookie policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Strict,
    Lax,
    None,
}

impl SameSitePolicy {
    fn as_str(&self) -> &'static str {
        match self {
            SameSitePolicy::Strict => "Strict",
            SameSitePolicy::Lax => "Lax",
            SameSitePolicy::None => "None",
        }
    }
}

/// A cookie ready to be rendered into a `Set-Cookie` header
#[derive(Debug, Clone)]
pub struct SessionCookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Cookie expiration, omitted for session-lifetime cookies
    pub expires: Option<DateTime<Utc>>,
    /// Max-Age in seconds, omitted for session-lifetime cookies
    pub max_age_seconds: Option<i64>,
    /// Cookie domain
    pub domain: Option<String>,
    /// Cookie path
    pub path: String,
    /// HTTP-only flag
    pub http_only: bool,
    /// Secure flag (HTTPS only)
    pub secure: bool,
    /// SameSite setting
    pub same_site: SameSitePolicy,
}

impl SessionCookie {
    /// Render this cookie as a `Set-Cookie` header value
    pub fn to_header_value(&self) -> String {
        let mut parts = vec![format!("{}={}", self.name, self.value)];
        if let Some(expires) = self.expires {
            parts.push(format!("Expires={}", expires.format(EXPIRES_FORMAT)));
        }
        if let Some(max_age) = self.max_age_seconds {
            parts.push(format!("Max-Age={}", max_age));
        }
        if let Some(domain) = &self.domain {
            parts.push(format!("Domain={}", domain));
        }
        parts.push(format!("Path={}", self.path));
        if self.secure {
            parts.push("Secure".to_string());
        }
        if self.http_only {
            parts.push("HttpOnly".to_string());
        }
        parts.push(format!("SameSite={}", self.same_site.as_str()));
        parts.join("; ")
    }
}

/// Issues sealed session cookies
pub struct SessionCookieFactory {
    cipher: CookieCipher,
    cookie: CookieConfig,
}

impl SessionCookieFactory {
    /// Create a factory from raw key bytes and cookie attributes
    pub fn new(key: &[u8], cookie: CookieConfig) -> Result<Self> {
        Ok(Self { cipher: CookieCipher::new(key)?, cookie })
    }

    /// Create a factory from validated session configuration
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let key = config.decode_key()?;
        Self::new(&key, config.cookie.clone())
    }

    /// Name issued cookies are stamped with
    pub fn cookie_name(&self) -> &str {
        &self.cookie.name
    }

    /// Seal a session for `user` expiring at `expiration`.
    ///
    /// `Max-Age` is the whole number of seconds until expiry, clamped at
    /// zero. A clamped cookie also gets its `Expires` forced to the Unix
    /// epoch so that clients ignoring `Max-Age` still drop it immediately.
    #[instrument(skip_all, fields(user = %user.username))]
    pub fn session_cookie(&self, user: &User, expiration: DateTime<Utc>) -> Result<SessionCookie> {
        let payload = SessionPayload { user: user.username.clone(), expiration };
        let plaintext = Zeroizing::new(serde_json::to_vec(&payload)?);
        let value = STANDARD.encode(self.cipher.encrypt(&plaintext)?);

        let max_age = (expiration - Utc::now()).num_seconds().max(0);
        let expires = if max_age == 0 { DateTime::UNIX_EPOCH } else { expiration };

        Ok(self.build(value, Some(expires), Some(max_age)))
    }

    /// The logout cookie: fixed sentinel value, already expired
    pub fn expired_session_cookie(&self) -> SessionCookie {
        self.build(EXPIRED_SESSION_VALUE.to_string(), Some(DateTime::UNIX_EPOCH), Some(0))
    }

    fn build(
        &self,
        value: String,
        expires: Option<DateTime<Utc>>,
        max_age_seconds: Option<i64>,
    ) -> SessionCookie {
        SessionCookie {
            name: self.cookie.name.clone(),
            value,
            expires,
            max_age_seconds,
            domain: self.cookie.domain.clone(),
            path: self.cookie.path.clone(),
            http_only: self.cookie.http_only,
            secure: self.cookie.secure,
            same_site: self.cookie.same_site,
        }
    }
}

/// Validates inbound session cookie values
pub struct CookieAuthenticator {
    cipher: CookieCipher,
}

impl CookieAuthenticator {
    /// Create an authenticator from raw key bytes
    pub fn new(key: &[u8]) -> Result<Self> {
        Ok(Self { cipher: CookieCipher::new(key)? })
    }

    /// Create an authenticator from validated session configuration
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let key = config.decode_key()?;
        Self::new(&key)
    }

    /// Check a cookie value and return the session's user when it holds a
    /// live, authentic session.
    ///
    /// Every failure mode comes back as `None`: garbled base64, the
    /// `"expired"` logout sentinel, a forged or truncated seal, an
    /// unparseable payload, and a session past its expiration. Unsigned
    /// values are indistinguishable from absent ones on purpose.
    #[instrument(skip_all)]
    pub fn authenticate(&self, cookie_value: &str) -> Option<User> {
        let sealed = STANDARD.decode(cookie_value).ok()?;
        let plaintext = match self.cipher.decrypt(&sealed) {
            Ok(plaintext) => Zeroizing::new(plaintext),
            Err(Error::BadTag) => {
                warn!("session cookie failed authentication");
                return None;
            }
            Err(_) => return None,
        };
        let payload: SessionPayload = serde_json::from_slice(&plaintext).ok()?;
        if payload.expiration < Utc::now() {
            return None;
        }
        Some(User { username: payload.user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_key() -> [u8; 32] {
        [0x24u8; 32]
    }

    fn factory() -> SessionCookieFactory {
        SessionCookieFactory::new(&test_key(), CookieConfig::default()).unwrap()
    }

    fn authenticator() -> CookieAuthenticator {
        CookieAuthenticator::new(&test_key()).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let expiration = Utc::now() + Duration::hours(1);
        let cookie = factory().session_cookie(&User::named("alice"), expiration).unwrap();

        let user = authenticator().authenticate(&cookie.value).unwrap();
        assert_eq!(user.username, "alice");
    }

    #[test]
    fn test_cookie_value_is_opaque() {
        let expiration = Utc::now() + Duration::hours(1);
        let cookie = factory().session_cookie(&User::named("alice"), expiration).unwrap();

        let raw = STANDARD.decode(&cookie.value).unwrap();
        assert!(!cookie.value.contains("alice"));
        assert!(!String::from_utf8_lossy(&raw).contains("alice"));
    }

    #[test]
    fn test_future_expiration_sets_max_age() {
        let expiration = Utc::now() + Duration::hours(1);
        let cookie = factory().session_cookie(&User::named("alice"), expiration).unwrap();

        let max_age = cookie.max_age_seconds.unwrap();
        assert!((3599..=3600).contains(&max_age), "max_age {}", max_age);
        assert_eq!(cookie.expires, Some(expiration));
    }

    #[test]
    fn test_past_expiration_clamps_to_epoch() {
        let expiration = Utc::now() - Duration::seconds(10);
        let cookie = factory().session_cookie(&User::named("alice"), expiration).unwrap();

        assert_eq!(cookie.max_age_seconds, Some(0));
        assert_eq!(cookie.expires, Some(DateTime::UNIX_EPOCH));

        let header = cookie.to_header_value();
        assert!(header.contains("Max-Age=0"));
        assert!(header.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
    }

    #[test]
    fn test_expired_session_cookie_sentinel() {
        let cookie = factory().expired_session_cookie();
        assert_eq!(cookie.value, EXPIRED_SESSION_VALUE);
        assert_eq!(cookie.max_age_seconds, Some(0));
        assert_eq!(cookie.expires, Some(DateTime::UNIX_EPOCH));

        // The sentinel never authenticates.
        assert!(authenticator().authenticate(&cookie.value).is_none());
    }

    #[test]
    fn test_tampered_value_is_rejected() {
        let expiration = Utc::now() + Duration::hours(1);
        let cookie = factory().session_cookie(&User::named("alice"), expiration).unwrap();

        let mut sealed = STANDARD.decode(&cookie.value).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        let forged = STANDARD.encode(sealed);

        assert!(authenticator().authenticate(&forged).is_none());
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let expiration = Utc::now() + Duration::hours(1);
        let cookie = factory().session_cookie(&User::named("alice"), expiration).unwrap();

        let other = CookieAuthenticator::new(&[0x25u8; 32]).unwrap();
        assert!(other.authenticate(&cookie.value).is_none());
    }

    #[test]
    fn test_expired_payload_is_rejected() {
        let expiration = Utc::now() - Duration::minutes(5);
        let cookie = factory().session_cookie(&User::named("alice"), expiration).unwrap();
        assert!(authenticator().authenticate(&cookie.value).is_none());
    }

    #[test]
    fn test_garbage_values_are_rejected() {
        let auth = authenticator();
        assert!(auth.authenticate("").is_none());
        assert!(auth.authenticate("not base64 at all!").is_none());
        assert!(auth.authenticate(&STANDARD.encode(b"too short")).is_none());
    }

    #[test]
    fn test_header_rendering() {
        let config = CookieConfig { domain: Some("example.com".to_string()), ..Default::default() };
        let factory = SessionCookieFactory::new(&test_key(), config).unwrap();
        let expiration = Utc::now() + Duration::hours(1);
        let cookie = factory.session_cookie(&User::named("alice"), expiration).unwrap();

        let header = cookie.to_header_value();
        assert!(header.starts_with("session="));
        assert!(header.contains("Domain=example.com"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("Secure"));
        assert!(header.contains("HttpOnly"));
        assert!(header.ends_with("SameSite=Strict"));
    }

    #[test]
    fn test_header_omits_absent_attributes() {
        let cookie = SessionCookie {
            name: "XSRF-TOKEN".to_string(),
            value: "abc".to_string(),
            expires: None,
            max_age_seconds: None,
            domain: None,
            path: "/".to_string(),
            http_only: false,
            secure: true,
            same_site: SameSitePolicy::Lax,
        };
        let header = cookie.to_header_value();
        assert_eq!(header, "XSRF-TOKEN=abc; Path=/; Secure; SameSite=Lax");
    }

    #[test]
    fn test_from_config() {
        let config = SessionConfig::default();
        let factory = SessionCookieFactory::from_config(&config).unwrap();
        let auth = CookieAuthenticator::from_config(&config).unwrap();

        let expiration = Utc::now() + config.ttl();
        let cookie = factory.session_cookie(&User::named("bob"), expiration).unwrap();
        assert_eq!(cookie.name, "session");
        assert_eq!(auth.authenticate(&cookie.value).unwrap().username, "bob");
    }
}
