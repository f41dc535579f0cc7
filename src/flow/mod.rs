//! Flow Orchestrator
//!
//! The state machine coordinating login and registration against the
//! identity backend. Login runs `Start -> Submitted -> {ChallengeRequired,
//! Authenticated, Rejected}`; a pending forced-password-change challenge is
//! resolved automatically with a single resubmission, and every other
//! outcome is terminal. Registration is a linear sequence with local
//! validation in front of the backend calls.
//!
//! Operations from different callers run concurrently with no shared mutable
//! state; suppressing duplicate submissions while one is in flight is the
//! UI's job, not enforced here.

use crate::cognito::{AuthError, IdentityBackend};
use crate::models::{
    ChallengeKind, Credentials, IdentityResult, NotegateSession, RegistrationReceipt,
};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Minimum secret length accepted by the local strength check
pub const MIN_SECRET_LENGTH: usize = 8;

/// Symbol characters counted by the strength check, matching the backend's
/// password policy character set
const SECRET_SYMBOLS: &str = "^$*.[]{}()?-\"!@#%&/\\,><':;|_~`+= ";

/// Identifier shape accepted for registration. Kept deliberately loose; the
/// backend performs its own validation on top.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern")
});

/// Orchestrates credential exchanges against the identity backend.
///
/// Holds only an immutable handle to the backend adapter; each login or
/// registration is one independent exchange.
#[derive(Clone)]
pub struct AuthFlow {
    backend: Arc<dyn IdentityBackend>,
}

impl AuthFlow {
    #[must_use]
    pub fn new(backend: Arc<dyn IdentityBackend>) -> Self {
        Self { backend }
    }

    /// Exchange credentials for a session.
    ///
    /// A `NEW_PASSWORD_REQUIRED` challenge is answered transparently by
    /// resubmitting the supplied secret as the new password, so a first
    /// sign-in after an admin-created account completes in one step and the
    /// caller never observes the intermediate challenge state. Any other
    /// challenge kind, and any failure of the single challenge response,
    /// rejects the login; there are no further automatic retries.
    ///
    /// TODO: prompt for a distinct new password instead of replaying the
    /// submitted one.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidCredentials`, `ChallengeRejected` or
    /// `BackendUnavailable`.
    pub async fn login(&self, credentials: &Credentials) -> Result<NotegateSession, AuthError> {
        let result = self.backend.authenticate(credentials).await?;

        let tokens = match result {
            IdentityResult::Authenticated(tokens) => tokens,
            IdentityResult::ChallengePending {
                kind: ChallengeKind::NewPasswordRequired,
                continuation,
            } => {
                debug!(
                    "resolving NEW_PASSWORD_REQUIRED challenge for {}",
                    credentials.identifier
                );
                let challenge_result = self
                    .backend
                    .respond_to_challenge(
                        &credentials.identifier,
                        &credentials.secret,
                        &ChallengeKind::NewPasswordRequired,
                        &continuation,
                    )
                    .await?;

                match challenge_result {
                    IdentityResult::Authenticated(tokens) => tokens,
                    IdentityResult::ChallengePending { kind, .. } => {
                        warn!("challenge chain not resolvable: {}", kind.name());
                        return Err(AuthError::ChallengeRejected(format!(
                            "further challenge required: {}",
                            kind.name()
                        )));
                    }
                }
            }
            IdentityResult::ChallengePending { kind, .. } => {
                warn!("unsupported challenge kind: {}", kind.name());
                return Err(AuthError::ChallengeRejected(format!(
                    "unsupported challenge: {}",
                    kind.name()
                )));
            }
        };

        info!("login succeeded for {}", credentials.identifier);
        Ok(NotegateSession::from_tokens(&credentials.identifier, tokens))
    }

    /// Register a new identity and confirm it immediately.
    ///
    /// Local checks run first: a weak secret or a malformed identifier fails
    /// fast without any backend call. On a successful registration the
    /// pending record is auto-confirmed, bypassing the backend's verification
    /// step - demo behavior, not something to extend. Confirmation is never
    /// attempted when registration failed. Registration never yields a
    /// session; callers follow up with [`login`](Self::login).
    ///
    /// # Errors
    ///
    /// Fails with `WeakSecret`, `InvalidFormat`, `IdentifierTaken` or
    /// `BackendUnavailable`.
    pub async fn register(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<RegistrationReceipt, AuthError> {
        validate_identifier(identifier)?;
        validate_secret_strength(secret)?;

        let receipt = self.backend.register(identifier, secret).await?;
        info!("registered {} (sub {})", identifier, receipt.user_sub);

        self.backend.confirm_registration(identifier).await?;
        debug!("auto-confirmed {identifier}");

        Ok(receipt)
    }
}

/// Local secret strength check: minimum length plus one uppercase, one
/// lowercase, one digit and one symbol.
///
/// # Errors
///
/// Fails with `WeakSecret` when the policy is not met.
pub fn validate_secret_strength(secret: &str) -> Result<(), AuthError> {
    let long_enough = secret.chars().count() >= MIN_SECRET_LENGTH;
    let has_upper = secret.chars().any(char::is_uppercase);
    let has_lower = secret.chars().any(char::is_lowercase);
    let has_digit = secret.chars().any(|c| c.is_ascii_digit());
    let has_symbol = secret.chars().any(|c| SECRET_SYMBOLS.contains(c));

    if long_enough && has_upper && has_lower && has_digit && has_symbol {
        Ok(())
    } else {
        Err(AuthError::WeakSecret)
    }
}

/// Local identifier shape check.
///
/// # Errors
///
/// Fails with `InvalidFormat` when the identifier is not email-shaped.
pub fn validate_identifier(identifier: &str) -> Result<(), AuthError> {
    if EMAIL_RE.is_match(identifier) {
        Ok(())
    } else {
        Err(AuthError::InvalidFormat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock::MockIdentityBackend;
    use crate::testing::{TEST_EMAIL, TEST_PASSWORD};

    fn flow(backend: MockIdentityBackend) -> (AuthFlow, Arc<MockIdentityBackend>) {
        let backend = Arc::new(backend);
        (AuthFlow::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn test_login_direct_success_uses_submitted_identifier() {
        let (flow, backend) = flow(MockIdentityBackend::authenticated());

        let session = flow
            .login(&Credentials::new(TEST_EMAIL, TEST_PASSWORD))
            .await
            .unwrap();

        assert_eq!(session.subject, TEST_EMAIL);
        assert_eq!(session.display_name, TEST_EMAIL);
        assert_eq!(backend.calls.authenticate(), 1);
        assert_eq!(backend.calls.respond_to_challenge(), 0);
    }

    #[tokio::test]
    async fn test_login_resolves_password_challenge_with_same_secret() {
        let (flow, backend) = flow(MockIdentityBackend::with_password_challenge());

        let session = flow
            .login(&Credentials::new(TEST_EMAIL, TEST_PASSWORD))
            .await
            .unwrap();

        // The challenge is resolved transparently with a single response
        // carrying the originally submitted secret
        assert_eq!(session.subject, TEST_EMAIL);
        assert_eq!(backend.calls.authenticate(), 1);
        assert_eq!(backend.calls.respond_to_challenge(), 1);
        assert_eq!(
            backend.calls.last_challenge_secret().as_deref(),
            Some(TEST_PASSWORD)
        );
    }

    #[tokio::test]
    async fn test_login_rejected_when_challenge_response_fails() {
        let (flow, backend) = flow(MockIdentityBackend::with_rejected_challenge());

        let err = flow
            .login(&Credentials::new(TEST_EMAIL, TEST_PASSWORD))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::ChallengeRejected(_)));
        assert_eq!(backend.calls.respond_to_challenge(), 1);
    }

    #[tokio::test]
    async fn test_login_rejects_unsupported_challenge_without_responding() {
        let (flow, backend) = flow(MockIdentityBackend::with_challenge_kind(
            ChallengeKind::Other("SMS_MFA".to_string()),
        ));

        let err = flow
            .login(&Credentials::new(TEST_EMAIL, TEST_PASSWORD))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::ChallengeRejected(_)));
        assert_eq!(backend.calls.respond_to_challenge(), 0);
    }

    #[tokio::test]
    async fn test_login_invalid_credentials() {
        let (flow, _backend) = flow(MockIdentityBackend::rejecting());

        let err = flow
            .login(&Credentials::new(TEST_EMAIL, "wrong-password"))
            .await
            .unwrap_err();

        assert_eq!(err, AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_register_weak_secret_skips_backend() {
        let (flow, backend) = flow(MockIdentityBackend::registering());

        // 7 characters, otherwise policy-complete
        let err = flow.register(TEST_EMAIL, "Weak1!a").await.unwrap_err();

        assert_eq!(err, AuthError::WeakSecret);
        assert_eq!(backend.calls.register(), 0);
        assert_eq!(backend.calls.confirm_registration(), 0);
    }

    #[tokio::test]
    async fn test_register_invalid_identifier_skips_backend() {
        let (flow, backend) = flow(MockIdentityBackend::registering());

        let err = flow.register("not-an-email", TEST_PASSWORD).await.unwrap_err();

        assert_eq!(err, AuthError::InvalidFormat);
        assert_eq!(backend.calls.register(), 0);
    }

    #[tokio::test]
    async fn test_register_confirms_after_success() {
        let (flow, backend) = flow(MockIdentityBackend::registering());

        flow.register(TEST_EMAIL, TEST_PASSWORD).await.unwrap();

        assert_eq!(backend.calls.register(), 1);
        assert_eq!(backend.calls.confirm_registration(), 1);
    }

    #[tokio::test]
    async fn test_register_failure_skips_confirmation() {
        let (flow, backend) = flow(MockIdentityBackend::register_taken());

        let err = flow.register(TEST_EMAIL, TEST_PASSWORD).await.unwrap_err();

        assert_eq!(err, AuthError::IdentifierTaken);
        assert_eq!(backend.calls.register(), 1);
        assert_eq!(backend.calls.confirm_registration(), 0);
    }

    #[test]
    fn test_secret_strength_policy() {
        assert!(validate_secret_strength("Strong1!").is_ok());
        assert!(validate_secret_strength("l0ng-And-Strong").is_ok());

        // Too short
        assert_eq!(
            validate_secret_strength("Weak1!a").unwrap_err(),
            AuthError::WeakSecret
        );
        // Missing symbol
        assert_eq!(
            validate_secret_strength("Weakpass1").unwrap_err(),
            AuthError::WeakSecret
        );
        // Missing digit
        assert_eq!(
            validate_secret_strength("Weakpass!").unwrap_err(),
            AuthError::WeakSecret
        );
        // Missing uppercase
        assert_eq!(
            validate_secret_strength("weakpass1!").unwrap_err(),
            AuthError::WeakSecret
        );
        // Missing lowercase
        assert_eq!(
            validate_secret_strength("WEAKPASS1!").unwrap_err(),
            AuthError::WeakSecret
        );
    }

    #[test]
    fn test_identifier_shape() {
        assert!(validate_identifier("a@b.com").is_ok());
        assert!(validate_identifier("first.last@sub.domain.org").is_ok());

        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("no-at-sign").is_err());
        assert!(validate_identifier("two@@signs.com").is_err());
        assert!(validate_identifier("spaces in@mail.com").is_err());
        assert!(validate_identifier("nodot@domain").is_err());
    }
}
