//! # Authentication
//!
//! Cookie-based session authentication: sealing and validating session
//! cookies, deriving XSRF tokens from them, and the request filters that
//! enforce both at the HTTP boundary.

pub mod cookie;
pub mod filter;
pub mod xsrf;

pub use cookie::{
    CookieAuthenticator, SameSitePolicy, SessionCookie, SessionCookieFactory, User,
    EXPIRED_SESSION_VALUE,
};
pub use filter::{CookieRenewingFilter, RequestContext, ResponseContext, XsrfFilter};
pub use xsrf::XsrfProtection;
