//! Identity Backend Adapter
//!
//! This module wraps the external identity provider's authentication API
//! (AWS Cognito user pools). All backend errors are caught at this boundary
//! and translated into [`AuthError`]; no backend-specific error shape escapes
//! to the flow orchestrator or the HTTP layer.
//!
//! # Modules
//!
//! - [`client`] - `CognitoClient`, the wire-level adapter implementation
//! - [`sigv4`] - AWS Signature V4 signing for the admin confirm call

pub mod client;
pub mod sigv4;

pub use client::CognitoClient;

use crate::models::{ChallengeKind, Credentials, IdentityResult, RegistrationReceipt};
use async_trait::async_trait;
use thiserror::Error;

/// Credential-exchange failures, as surfaced to callers.
///
/// Every backend failure is mapped into one of these variants; local
/// validation failures (weak secret, malformed identifier) use the same
/// taxonomy so callers see a single error surface. None of these are fatal
/// to the process - each is recoverable by retrying with corrected input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The backend rejected the identifier/secret pair
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A challenge response was not accepted, or the challenge kind cannot
    /// be resolved automatically
    #[error("challenge rejected: {0}")]
    ChallengeRejected(String),

    /// Registration for an identifier that already has an identity record
    #[error("an account with this identifier already exists")]
    IdentifierTaken,

    /// The secret does not meet the strength policy
    #[error("secret does not meet strength requirements")]
    WeakSecret,

    /// The identifier or secret is not in an acceptable format
    #[error("invalid identifier or secret format")]
    InvalidFormat,

    /// The backend could not be reached, timed out, or failed internally
    #[error("identity backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// Contract for the identity backend.
///
/// Implemented by [`CognitoClient`] for the real backend and by the mock
/// backends in the `testing` module. Every operation is one independent
/// request-response exchange; implementations hold no per-operation state.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Exchange a credential pair for tokens or a pending challenge.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidCredentials` when the backend rejects the pair, or
    /// `BackendUnavailable` when the backend cannot be reached.
    async fn authenticate(&self, credentials: &Credentials) -> Result<IdentityResult, AuthError>;

    /// Answer a pending challenge, continuing the exchange started by
    /// [`authenticate`](Self::authenticate).
    ///
    /// # Errors
    ///
    /// Fails with `ChallengeRejected` when the response is not accepted, or
    /// `BackendUnavailable` when the backend cannot be reached.
    async fn respond_to_challenge(
        &self,
        identifier: &str,
        secret: &str,
        kind: &ChallengeKind,
        continuation: &str,
    ) -> Result<IdentityResult, AuthError>;

    /// Create a pending identity record for the identifier.
    ///
    /// # Errors
    ///
    /// Fails with `IdentifierTaken`, `WeakSecret`, `InvalidFormat` or
    /// `BackendUnavailable`.
    async fn register(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<RegistrationReceipt, AuthError>;

    /// Confirm a pending identity record without user-side verification.
    ///
    /// # Errors
    ///
    /// Fails with `BackendUnavailable` on any backend failure.
    async fn confirm_registration(&self, identifier: &str) -> Result<(), AuthError>;
}
