//! Session Management Module
//!
//! Session issuance, decoding and cookie transport for notegate.
//!
//! # Modules
//!
//! - [`issuer`] - signed session token issuance and decoding
//! - [`cookie`] - cookie transport for the signed token

pub mod cookie;
pub mod issuer;

pub use cookie::{CookieFactory, CookieOptions, COOKIE_NAME};
pub use issuer::{SessionError, SessionIssuer};

use crate::models::NotegateSession;
use crate::utils::crypto::derive_signing_key;
use actix_web::{cookie::Cookie, HttpRequest};
use anyhow::Result;

/// Central coordination point for session operations: issues signed tokens,
/// wraps them in cookies, and reads sessions back from requests.
///
/// Holds only read-only state (the derived signing key and cookie policy),
/// so one instance is shared across all request handlers.
#[derive(Clone)]
pub struct SessionManager {
    issuer: SessionIssuer,
    cookie_factory: CookieFactory,
    cookie_secure: bool,
}

impl SessionManager {
    /// Create a new session manager from the raw session secret
    #[must_use]
    pub fn new(secret: &[u8], cookie_secure: bool, session_duration_hours: u64) -> Self {
        let signing_key = derive_signing_key(secret);

        Self {
            issuer: SessionIssuer::new(signing_key, session_duration_hours),
            cookie_factory: CookieFactory::new(cookie_secure, session_duration_hours),
            cookie_secure,
        }
    }

    /// Issue a signed token for the session and wrap it in the session
    /// cookie.
    ///
    /// # Errors
    ///
    /// Returns an error if token issuance fails
    pub fn issue_cookie(&self, session: &NotegateSession) -> Result<Cookie<'static>> {
        let token = self.issuer.issue(session)?;
        Ok(self.cookie_factory.create_session_cookie(&token))
    }

    /// Read the session presented on a request.
    ///
    /// Returns `Ok(None)` when no session cookie is present.
    ///
    /// # Errors
    ///
    /// Fails with `Expired`, `Malformed` or `SignatureInvalid` when a cookie
    /// is present but its token does not decode.
    pub fn session_from_request(
        &self,
        req: &HttpRequest,
    ) -> Result<Option<NotegateSession>, SessionError> {
        match cookie::extract_session_token(req) {
            Some(token) => self.issuer.decode(&token).map(Some),
            None => Ok(None),
        }
    }

    /// Cookie that clears the session on the client
    #[must_use]
    pub fn sign_out_cookie(&self) -> Cookie<'static> {
        self.cookie_factory.create_expired_cookie()
    }

    /// Direct access to the issuer, for callers that handle raw tokens
    #[must_use]
    pub fn issuer(&self) -> &SessionIssuer {
        &self.issuer
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}
