//! Request filters guarding state-changing endpoints.
//!
//! The trust core never links a web framework. Filters see requests and
//! responses through the two small traits below; the embedding service
//! implements them over whatever HTTP types it uses and maps
//! [`Error::Unauthorized`] to a 401.
//!
//! Denials are uniform on the wire and specific in the logs: each one gets a
//! correlation id and a warning naming what was actually wrong.

use chrono::Utc;
use tracing::{info, info_span, warn};

use crate::auth::cookie::{CookieAuthenticator, SessionCookie, SessionCookieFactory};
use crate::auth::xsrf::XsrfProtection;
use crate::config::settings::{SessionConfig, XsrfConfig};
use crate::errors::{Error, Result};

/// Read-only view of an inbound request
pub trait RequestContext {
    /// Request path, without query string
    fn path(&self) -> &str;
    /// First value of a request header, if present
    fn header(&self, name: &str) -> Option<&str>;
    /// Value of a request cookie, if present
    fn cookie(&self, name: &str) -> Option<&str>;
}

/// Write-side view of an outbound response
pub trait ResponseContext {
    /// Append a `Set-Cookie` to the response
    fn add_cookie(&mut self, cookie: SessionCookie);
    /// Whether the response already sets a cookie with this name
    fn has_cookie(&self, name: &str) -> bool;
}

/// Rejects state-changing requests whose XSRF header does not prove cookie
/// access.
pub struct XsrfFilter {
    header_name: String,
    excluded_paths: Vec<String>,
    session_cookie_name: String,
}

impl XsrfFilter {
    pub fn new(config: &XsrfConfig, session_cookie_name: impl Into<String>) -> Self {
        Self {
            header_name: config.header_name.clone(),
            excluded_paths: config.excluded_paths.clone(),
            session_cookie_name: session_cookie_name.into(),
        }
    }

    /// Allow or deny a request.
    ///
    /// Paths on the exclusion list pass without inspection; login cannot
    /// carry a token derived from a session that does not exist yet. Every
    /// other failure returns the same [`Error::Unauthorized`].
    pub fn check(&self, request: &dyn RequestContext) -> Result<()> {
        let path = request.path();
        if self.excluded_paths.iter().any(|excluded| excluded == path) {
            return Ok(());
        }

        let correlation_id = uuid::Uuid::new_v4();
        let span = info_span!(
            "xsrf_filter.check",
            http.path = %path,
            correlation_id = %correlation_id
        );
        let _guard = span.enter();

        let challenge = match request.header(&self.header_name) {
            Some(value) if !value.is_empty() => value,
            _ => {
                warn!(%correlation_id, header = %self.header_name, "request missing XSRF header");
                return Err(Error::Unauthorized);
            }
        };
        let session = match request.cookie(&self.session_cookie_name) {
            Some(value) if !value.is_empty() => value,
            _ => {
                warn!(
                    %correlation_id,
                    cookie = %self.session_cookie_name,
                    "request missing session cookie"
                );
                return Err(Error::Unauthorized);
            }
        };

        match XsrfProtection::is_valid(challenge, session) {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!(%correlation_id, "XSRF token does not match session cookie");
                Err(Error::Unauthorized)
            }
            Err(err) => {
                warn!(%correlation_id, error = %err, "XSRF validation failed");
                Err(Error::Unauthorized)
            }
        }
    }
}

/// Slides the session window forward on every authenticated request.
///
/// A fresh session cookie (and its matching XSRF cookie) is stamped onto the
/// response whenever the request carried a valid session, so sessions expire
/// a fixed interval after the last use rather than after login.
pub struct CookieRenewingFilter {
    authenticator: CookieAuthenticator,
    factory: SessionCookieFactory,
    xsrf: XsrfProtection,
    ttl: chrono::Duration,
}

impl CookieRenewingFilter {
    pub fn new(session: &SessionConfig, xsrf: &XsrfConfig) -> Result<Self> {
        Ok(Self {
            authenticator: CookieAuthenticator::from_config(session)?,
            factory: SessionCookieFactory::from_config(session)?,
            xsrf: XsrfProtection::from_config(xsrf)?,
            ttl: session.ttl(),
        })
    }

    /// Re-issue cookies for an authenticated request.
    ///
    /// Does nothing when the response already sets a session cookie (login
    /// and logout own their cookies), when the request carried none, or when
    /// the carried one does not authenticate.
    pub fn renew(
        &self,
        request: &dyn RequestContext,
        response: &mut dyn ResponseContext,
    ) -> Result<()> {
        if response.has_cookie(self.factory.cookie_name()) {
            return Ok(());
        }
        let value = match request.cookie(self.factory.cookie_name()) {
            Some(value) => value,
            None => return Ok(()),
        };
        let user = match self.authenticator.authenticate(value) {
            Some(user) => user,
            None => return Ok(()),
        };

        let session_cookie = self.factory.session_cookie(&user, Utc::now() + self.ttl)?;
        let xsrf_cookie = self.xsrf.generate(&session_cookie.value)?;
        info!(user = %user.username, "renewed session cookie");
        response.add_cookie(session_cookie);
        response.add_cookie(xsrf_cookie);
        Ok(())
    }
}
