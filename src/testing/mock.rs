//! Identity backend doubles for testing
//!
//! Two flavors: [`MockIdentityBackend`] returns scripted responses and is
//! suited to exercising single flow transitions, while [`InMemoryUserPool`]
//! behaves like a tiny user pool so whole register-then-login journeys can
//! run without a network.

use crate::cognito::{AuthError, IdentityBackend};
use crate::models::{
    ChallengeKind, Credentials, IdentityResult, ProviderTokens, RegistrationReceipt,
};
use crate::testing::constants::{
    TEST_ACCESS_TOKEN, TEST_CONTINUATION, TEST_ID_TOKEN, TEST_REFRESH_TOKEN,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// Per-operation invocation counters, shared by both backend doubles.
/// Tests assert against these to prove which backend calls happened.
#[derive(Default)]
pub struct CallLog {
    authenticate: AtomicUsize,
    respond_to_challenge: AtomicUsize,
    register: AtomicUsize,
    confirm_registration: AtomicUsize,
    last_challenge_secret: Mutex<Option<String>>,
}

impl CallLog {
    #[must_use]
    pub fn authenticate(&self) -> usize {
        self.authenticate.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn respond_to_challenge(&self) -> usize {
        self.respond_to_challenge.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn register(&self) -> usize {
        self.register.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn confirm_registration(&self) -> usize {
        self.confirm_registration.load(Ordering::Relaxed)
    }

    /// The secret submitted with the most recent challenge response
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned
    #[must_use]
    pub fn last_challenge_secret(&self) -> Option<String> {
        self.last_challenge_secret.lock().unwrap().clone()
    }

    fn record_challenge(&self, secret: &str) {
        self.respond_to_challenge.fetch_add(1, Ordering::Relaxed);
        *self.last_challenge_secret.lock().unwrap() = Some(secret.to_string());
    }
}

/// Standard token bundle handed out by the doubles
#[must_use]
pub fn test_tokens() -> ProviderTokens {
    ProviderTokens {
        access_token: TEST_ACCESS_TOKEN.to_string(),
        id_token: TEST_ID_TOKEN.to_string(),
        refresh_token: Some(TEST_REFRESH_TOKEN.to_string()),
    }
}

/// Scripted identity backend: each operation returns its configured result.
/// Unconfigured operations report the backend as unavailable, which makes an
/// unexpected call fail the test loudly.
pub struct MockIdentityBackend {
    authenticate_result: Option<Result<IdentityResult, AuthError>>,
    challenge_result: Option<Result<IdentityResult, AuthError>>,
    register_result: Option<Result<RegistrationReceipt, AuthError>>,
    confirm_result: Option<Result<(), AuthError>>,
    pub calls: CallLog,
}

impl MockIdentityBackend {
    fn empty() -> Self {
        Self {
            authenticate_result: None,
            challenge_result: None,
            register_result: None,
            confirm_result: None,
            calls: CallLog::default(),
        }
    }

    /// Backend that authenticates directly
    #[must_use]
    pub fn authenticated() -> Self {
        Self {
            authenticate_result: Some(Ok(IdentityResult::Authenticated(test_tokens()))),
            ..Self::empty()
        }
    }

    /// Backend that rejects the credential pair
    #[must_use]
    pub fn rejecting() -> Self {
        Self {
            authenticate_result: Some(Err(AuthError::InvalidCredentials)),
            ..Self::empty()
        }
    }

    /// Backend that is unreachable for every operation
    #[must_use]
    pub fn unavailable() -> Self {
        let unavailable = || AuthError::BackendUnavailable("request timed out".to_string());
        Self {
            authenticate_result: Some(Err(unavailable())),
            challenge_result: Some(Err(unavailable())),
            register_result: Some(Err(unavailable())),
            confirm_result: Some(Err(unavailable())),
            calls: CallLog::default(),
        }
    }

    /// Backend that raises a password challenge, then accepts the response
    #[must_use]
    pub fn with_password_challenge() -> Self {
        Self {
            authenticate_result: Some(Ok(IdentityResult::ChallengePending {
                kind: ChallengeKind::NewPasswordRequired,
                continuation: TEST_CONTINUATION.to_string(),
            })),
            challenge_result: Some(Ok(IdentityResult::Authenticated(test_tokens()))),
            ..Self::empty()
        }
    }

    /// Backend that raises a password challenge and rejects the response
    #[must_use]
    pub fn with_rejected_challenge() -> Self {
        Self {
            challenge_result: Some(Err(AuthError::ChallengeRejected(
                "challenge not satisfied".to_string(),
            ))),
            ..Self::with_password_challenge()
        }
    }

    /// Backend that raises a challenge of the given kind
    #[must_use]
    pub fn with_challenge_kind(kind: ChallengeKind) -> Self {
        Self {
            authenticate_result: Some(Ok(IdentityResult::ChallengePending {
                kind,
                continuation: TEST_CONTINUATION.to_string(),
            })),
            ..Self::empty()
        }
    }

    /// Backend that accepts a registration and its confirmation
    #[must_use]
    pub fn registering() -> Self {
        Self {
            register_result: Some(Ok(RegistrationReceipt {
                user_sub: Uuid::new_v4(),
            })),
            confirm_result: Some(Ok(())),
            ..Self::empty()
        }
    }

    /// Backend that reports the identifier as already registered
    #[must_use]
    pub fn register_taken() -> Self {
        Self {
            register_result: Some(Err(AuthError::IdentifierTaken)),
            confirm_result: Some(Ok(())),
            ..Self::empty()
        }
    }

    fn unscripted() -> AuthError {
        AuthError::BackendUnavailable("mock: no scripted response".to_string())
    }
}

#[async_trait]
impl IdentityBackend for MockIdentityBackend {
    async fn authenticate(&self, _credentials: &Credentials) -> Result<IdentityResult, AuthError> {
        self.calls.authenticate.fetch_add(1, Ordering::Relaxed);
        self.authenticate_result
            .clone()
            .unwrap_or_else(|| Err(Self::unscripted()))
    }

    async fn respond_to_challenge(
        &self,
        _identifier: &str,
        secret: &str,
        _kind: &ChallengeKind,
        _continuation: &str,
    ) -> Result<IdentityResult, AuthError> {
        self.calls.record_challenge(secret);
        self.challenge_result
            .clone()
            .unwrap_or_else(|| Err(Self::unscripted()))
    }

    async fn register(
        &self,
        _identifier: &str,
        _secret: &str,
    ) -> Result<RegistrationReceipt, AuthError> {
        self.calls.register.fetch_add(1, Ordering::Relaxed);
        self.register_result
            .clone()
            .unwrap_or_else(|| Err(Self::unscripted()))
    }

    async fn confirm_registration(&self, _identifier: &str) -> Result<(), AuthError> {
        self.calls.confirm_registration.fetch_add(1, Ordering::Relaxed);
        self.confirm_result
            .clone()
            .unwrap_or_else(|| Err(Self::unscripted()))
    }
}

struct UserRecord {
    password: String,
    confirmed: bool,
    requires_new_password: bool,
    sub: Uuid,
}

/// In-memory user pool behaving like the real backend for whole journeys:
/// registration creates a pending record, confirmation flips it live,
/// authentication checks the stored password and may raise a password
/// challenge for seeded accounts.
#[derive(Default)]
pub struct InMemoryUserPool {
    users: Mutex<HashMap<String, UserRecord>>,
    challenges: Mutex<HashMap<String, String>>,
    pub calls: CallLog,
}

impl InMemoryUserPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a confirmed account
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned
    pub fn seed_user(&self, identifier: &str, password: &str) {
        self.users.lock().unwrap().insert(
            identifier.to_string(),
            UserRecord {
                password: password.to_string(),
                confirmed: true,
                requires_new_password: false,
                sub: Uuid::new_v4(),
            },
        );
    }

    /// Seed a confirmed account that must rotate its password on first
    /// sign-in, like an admin-created user
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned
    pub fn seed_user_requiring_new_password(&self, identifier: &str, password: &str) {
        self.users.lock().unwrap().insert(
            identifier.to_string(),
            UserRecord {
                password: password.to_string(),
                confirmed: true,
                requires_new_password: true,
                sub: Uuid::new_v4(),
            },
        );
    }

    fn tokens_for(sub: Uuid) -> ProviderTokens {
        ProviderTokens {
            access_token: format!("access-{sub}"),
            id_token: format!("id-{sub}"),
            refresh_token: Some(format!("refresh-{sub}")),
        }
    }
}

#[async_trait]
impl IdentityBackend for InMemoryUserPool {
    async fn authenticate(&self, credentials: &Credentials) -> Result<IdentityResult, AuthError> {
        self.calls.authenticate.fetch_add(1, Ordering::Relaxed);

        let (requires_new_password, sub) = {
            let users = self.users.lock().unwrap();
            let Some(user) = users.get(&credentials.identifier) else {
                return Err(AuthError::InvalidCredentials);
            };
            if user.password != credentials.secret || !user.confirmed {
                return Err(AuthError::InvalidCredentials);
            }
            (user.requires_new_password, user.sub)
        };

        if requires_new_password {
            let continuation = Uuid::new_v4().to_string();
            self.challenges
                .lock()
                .unwrap()
                .insert(continuation.clone(), credentials.identifier.clone());
            return Ok(IdentityResult::ChallengePending {
                kind: ChallengeKind::NewPasswordRequired,
                continuation,
            });
        }

        Ok(IdentityResult::Authenticated(Self::tokens_for(sub)))
    }

    async fn respond_to_challenge(
        &self,
        identifier: &str,
        secret: &str,
        kind: &ChallengeKind,
        continuation: &str,
    ) -> Result<IdentityResult, AuthError> {
        self.calls.record_challenge(secret);

        if *kind != ChallengeKind::NewPasswordRequired {
            return Err(AuthError::ChallengeRejected(format!(
                "unsupported challenge: {}",
                kind.name()
            )));
        }

        let challenged = self.challenges.lock().unwrap().remove(continuation);
        if challenged.as_deref() != Some(identifier) {
            return Err(AuthError::ChallengeRejected(
                "unknown continuation".to_string(),
            ));
        }

        let mut users = self.users.lock().unwrap();
        let Some(user) = users.get_mut(identifier) else {
            return Err(AuthError::ChallengeRejected("unknown user".to_string()));
        };
        if user.password != secret {
            return Err(AuthError::ChallengeRejected(
                "challenge not satisfied".to_string(),
            ));
        }

        // The response carries the secret as the new password as well
        user.requires_new_password = false;
        Ok(IdentityResult::Authenticated(Self::tokens_for(user.sub)))
    }

    async fn register(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<RegistrationReceipt, AuthError> {
        self.calls.register.fetch_add(1, Ordering::Relaxed);

        let mut users = self.users.lock().unwrap();
        if users.contains_key(identifier) {
            return Err(AuthError::IdentifierTaken);
        }

        let sub = Uuid::new_v4();
        users.insert(
            identifier.to_string(),
            UserRecord {
                password: secret.to_string(),
                confirmed: false,
                requires_new_password: false,
                sub,
            },
        );

        Ok(RegistrationReceipt { user_sub: sub })
    }

    async fn confirm_registration(&self, identifier: &str) -> Result<(), AuthError> {
        self.calls.confirm_registration.fetch_add(1, Ordering::Relaxed);

        let mut users = self.users.lock().unwrap();
        match users.get_mut(identifier) {
            Some(user) => {
                user.confirmed = true;
                Ok(())
            }
            None => Err(AuthError::BackendUnavailable(
                "no such pending registration".to_string(),
            )),
        }
    }
}
