//! Session issuance and decoding
//!
//! Turns an authenticated exchange into a signed, time-bounded session token
//! (HS256 JWT) and decodes tokens presented back on later requests. The
//! signing key is derived once from process-wide configuration and never
//! mutated.

use crate::models::NotegateSession;
use crate::utils::crypto::{hmac_sha256, verify_hmac_sha256, SIGNING_KEY_SIZE};
use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures when decoding a presented session token
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The token's validity window has passed
    #[error("session expired")]
    Expired,

    /// The token is not structurally a signed session token
    #[error("malformed session token")]
    Malformed,

    /// The token's signature does not verify against the signing key
    #[error("session signature invalid")]
    SignatureInvalid,
}

/// Claims carried in the signed session token.
///
/// Fixed shape: the provider tokens are named, typed fields rather than an
/// open-ended map.
#[derive(Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    name: String,
    iat: i64,
    exp: i64,
    access_token: String,
    id_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

/// Issues and decodes signed session tokens.
///
/// There is no refresh operation: no refresh-token exchange is performed
/// against the identity backend, so a caller whose provider tokens have
/// expired must re-authenticate.
#[derive(Clone)]
pub struct SessionIssuer {
    signing_key: [u8; SIGNING_KEY_SIZE],
    session_duration_hours: u64,
}

impl SessionIssuer {
    #[must_use]
    pub fn new(signing_key: [u8; SIGNING_KEY_SIZE], session_duration_hours: u64) -> Self {
        Self {
            signing_key,
            session_duration_hours,
        }
    }

    /// Encode a session into a signed token valid for the configured
    /// duration.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or signing fails
    pub fn issue(&self, session: &NotegateSession) -> Result<String> {
        let expires_at =
            Utc::now() + Duration::hours(i64::try_from(self.session_duration_hours).unwrap_or(24));
        self.issue_with_expiry(session, expires_at)
    }

    /// Encode a session into a signed token with an explicit expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or signing fails
    pub fn issue_with_expiry(
        &self,
        session: &NotegateSession,
        expires_at: DateTime<Utc>,
    ) -> Result<String> {
        let header = serde_json::json!({ "alg": "HS256", "typ": "JWT" });
        let claims = SessionClaims {
            sub: session.subject.clone(),
            name: session.display_name.clone(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
            access_token: session.access_token.clone(),
            id_token: session.id_token.clone(),
            refresh_token: session.refresh_token.clone(),
        };

        let header_json =
            serde_json::to_string(&header).context("Failed to serialize token header")?;
        let claims_json =
            serde_json::to_string(&claims).context("Failed to serialize token claims")?;

        let header_b64 = general_purpose::URL_SAFE_NO_PAD.encode(header_json.as_bytes());
        let claims_b64 = general_purpose::URL_SAFE_NO_PAD.encode(claims_json.as_bytes());
        let message = format!("{header_b64}.{claims_b64}");

        let signature = hmac_sha256(message.as_bytes(), &self.signing_key)?;
        let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(&signature);

        Ok(format!("{message}.{signature_b64}"))
    }

    /// Decode and verify a presented token back into a session.
    ///
    /// The signature is verified before any claim is trusted; expiry is
    /// checked only after the signature holds, so a tampered token always
    /// reports `SignatureInvalid` even when it is also stale.
    ///
    /// # Errors
    ///
    /// Fails with `Malformed`, `SignatureInvalid` or `Expired`.
    pub fn decode(&self, token: &str) -> Result<NotegateSession, SessionError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(SessionError::Malformed);
        };

        let signature = general_purpose::URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| SessionError::Malformed)?;

        let message = format!("{header_b64}.{claims_b64}");
        if !verify_hmac_sha256(message.as_bytes(), &self.signing_key, &signature) {
            return Err(SessionError::SignatureInvalid);
        }

        let claims_bytes = general_purpose::URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| SessionError::Malformed)?;
        let claims: SessionClaims =
            serde_json::from_slice(&claims_bytes).map_err(|_| SessionError::Malformed)?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(SessionError::Expired);
        }

        Ok(NotegateSession {
            subject: claims.sub,
            display_name: claims.name,
            access_token: claims.access_token,
            id_token: claims.id_token,
            refresh_token: claims.refresh_token,
        })
    }
}
