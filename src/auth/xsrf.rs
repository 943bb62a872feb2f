//! Cross-site request forgery protection.
//!
//! The XSRF token is a SHA-512 digest of the session cookie value, handed to
//! the browser in a cookie that scripts can read and echoed back in a request
//! header. A cross-site attacker can trigger requests that carry the cookies,
//! but cannot read them, so it can never fill in the header.

use sha2::{Digest, Sha512};

use crate::auth::cookie::SessionCookie;
use crate::config::settings::{CookieConfig, XsrfConfig};
use crate::crypto::subtle;
use crate::errors::{Error, Result};

/// Derives and validates XSRF tokens bound to a session cookie value.
#[derive(Debug)]
pub struct XsrfProtection {
    cookie: CookieConfig,
}

impl XsrfProtection {
    /// Create from the XSRF cookie attributes.
    ///
    /// Fails when the attributes mark the cookie HttpOnly: a token the
    /// browser cannot read protects nothing.
    pub fn new(cookie: CookieConfig) -> Result<Self> {
        if cookie.http_only {
            return Err(Error::config(
                "XSRF cookie cannot be HttpOnly; scripts must read it to echo the header",
            ));
        }
        Ok(Self { cookie })
    }

    /// Create from validated XSRF configuration
    pub fn from_config(config: &XsrfConfig) -> Result<Self> {
        Self::new(config.cookie.clone())
    }

    /// Derive the token for a session cookie value: lowercase hex SHA-512
    pub fn token_for(session_value: &str) -> Result<String> {
        if session_value.is_empty() {
            return Err(Error::invalid_argument("session cookie value may not be empty"));
        }
        Ok(hex::encode(Sha512::digest(session_value.as_bytes())))
    }

    /// Build the XSRF cookie for a session cookie value.
    ///
    /// The cookie carries no `Expires` or `Max-Age`: it lives exactly as long
    /// as the browser session, like the token it shadows.
    pub fn generate(&self, session_value: &str) -> Result<SessionCookie> {
        let token = Self::token_for(session_value)?;
        Ok(SessionCookie {
            name: self.cookie.name.clone(),
            value: token,
            expires: None,
            max_age_seconds: None,
            domain: self.cookie.domain.clone(),
            path: self.cookie.path.clone(),
            http_only: false,
            secure: self.cookie.secure,
            same_site: self.cookie.same_site,
        })
    }

    /// Check an echoed token against the session cookie value it should be
    /// derived from.
    ///
    /// Empty arguments are caller bugs and fail loudly instead of quietly
    /// comparing nothing.
    pub fn is_valid(challenge: &str, session_value: &str) -> Result<bool> {
        if challenge.is_empty() {
            return Err(Error::invalid_argument("XSRF token may not be empty"));
        }
        if session_value.is_empty() {
            return Err(Error::invalid_argument("session cookie value may not be empty"));
        }
        let expected = Self::token_for(session_value)?;
        Ok(subtle::secure_compare_str(challenge, &expected))
    }
}
