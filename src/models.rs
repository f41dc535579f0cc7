use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// A credential pair submitted for one exchange against the identity backend.
///
/// Credentials are transient: they are used for a single exchange and never
/// persisted. The secret is redacted from debug output so request logging
/// cannot leak it.
#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl Credentials {
    #[must_use]
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Opaque bearer tokens issued by the identity backend on a successful
/// exchange. The refresh token is absent for some backend flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTokens {
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: Option<String>,
}

/// Intermediate step the identity backend may require before issuing tokens.
///
/// Only `NewPasswordRequired` can be resolved automatically by the login
/// flow; any other kind surfaces as a rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeKind {
    NewPasswordRequired,
    Other(String),
}

impl ChallengeKind {
    /// Parse a backend challenge name into a kind.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "NEW_PASSWORD_REQUIRED" => Self::NewPasswordRequired,
            other => Self::Other(other.to_string()),
        }
    }

    /// The backend wire name for this challenge kind.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::NewPasswordRequired => "NEW_PASSWORD_REQUIRED",
            Self::Other(name) => name,
        }
    }
}

/// Outcome of a credential exchange attempt.
///
/// A session is only ever constructed from the `Authenticated` variant;
/// `ChallengePending` must never be surfaced to callers as a usable session.
#[derive(Debug, Clone)]
pub enum IdentityResult {
    /// The backend verified the credentials and issued tokens.
    Authenticated(ProviderTokens),
    /// The backend requires a challenge response before issuing tokens.
    /// `continuation` is the opaque state handle to echo back.
    ChallengePending {
        kind: ChallengeKind,
        continuation: String,
    },
}

/// Receipt for a submitted registration. `user_sub` is the backend's
/// identifier for the pending identity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    pub user_sub: Uuid,
}

/// The application session: a successfully authenticated user plus the
/// provider tokens needed to call downstream APIs.
///
/// A session is created whole from an authenticated exchange and mutated
/// only by re-issuance. There is no refresh-token exchange against the
/// identity backend; once the embedded provider tokens expire the caller
/// must re-authenticate.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NotegateSession {
    pub subject: String,
    pub display_name: String,
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: Option<String>,
}

impl NotegateSession {
    /// Build a session from the tokens of an authenticated exchange.
    /// The display name defaults to the submitted identifier.
    #[must_use]
    pub fn from_tokens(identifier: &str, tokens: ProviderTokens) -> Self {
        Self {
            subject: identifier.to_string(),
            display_name: identifier.to_string(),
            access_token: tokens.access_token,
            id_token: tokens.id_token,
            refresh_token: tokens.refresh_token,
        }
    }

    /// The bearer credential attached to downstream notes-API calls.
    #[must_use]
    pub fn bearer_token(&self) -> &str {
        &self.id_token
    }
}
