//! Wire-level Cognito user-pool client
//!
//! Speaks the `x-amz-json-1.1` protocol: every operation is a POST to the
//! regional endpoint with an `X-Amz-Target` header naming the operation.
//! The client-side auth operations are unauthenticated; the admin confirm
//! call is signed with SigV4 using the configured AWS key pair.

use crate::cognito::sigv4::{self, SigV4Params};
use crate::cognito::{AuthError, IdentityBackend};
use crate::models::{
    ChallengeKind, Credentials, IdentityResult, ProviderTokens, RegistrationReceipt,
};
use crate::settings::CognitoSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

const CONTENT_TYPE_AMZ_JSON: &str = "application/x-amz-json-1.1";
const TARGET_INITIATE_AUTH: &str = "AWSCognitoIdentityProviderService.InitiateAuth";
const TARGET_RESPOND_TO_CHALLENGE: &str =
    "AWSCognitoIdentityProviderService.RespondToAuthChallenge";
const TARGET_SIGN_UP: &str = "AWSCognitoIdentityProviderService.SignUp";
const TARGET_ADMIN_CONFIRM_SIGN_UP: &str =
    "AWSCognitoIdentityProviderService.AdminConfirmSignUp";

/// Internal failure of one wire call, before translation into [`AuthError`]
enum CallError {
    /// The backend could not be reached or answered outside the protocol
    Transport(String),
    /// The backend answered with a modeled API error
    Api { error_type: String, message: String },
}

/// Identity backend adapter for an AWS Cognito user pool
pub struct CognitoClient {
    http: reqwest::Client,
    endpoint: Url,
    region: String,
    client_id: String,
    user_pool_id: String,
    access_key_id: String,
    secret_access_key: String,
}

impl CognitoClient {
    /// Build a client from settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is invalid or the HTTP client
    /// cannot be constructed.
    pub fn from_settings(settings: &CognitoSettings) -> Result<Self> {
        let endpoint = Url::parse(&settings.endpoint_url())
            .context("Invalid identity backend endpoint URL")?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint,
            region: settings.region.clone(),
            client_id: settings.client_id.clone(),
            user_pool_id: settings.user_pool_id.clone(),
            access_key_id: settings.access_key_id.clone(),
            secret_access_key: settings.secret_access_key.clone(),
        })
    }

    /// Execute one operation against the backend.
    ///
    /// `signed` requests carry a SigV4 `Authorization` header; the
    /// client-side auth operations are sent unauthenticated.
    async fn call(&self, target: &str, body: &Value, signed: bool) -> Result<Value, CallError> {
        let payload =
            serde_json::to_vec(body).map_err(|e| CallError::Transport(e.to_string()))?;

        let mut request = self
            .http
            .post(self.endpoint.clone())
            .header("Content-Type", CONTENT_TYPE_AMZ_JSON)
            .header("X-Amz-Target", target);

        if signed {
            let params = SigV4Params {
                access_key_id: &self.access_key_id,
                secret_access_key: &self.secret_access_key,
                region: &self.region,
                service: "cognito-idp",
            };
            let headers = sigv4::sign_post_request(
                &params,
                &self.endpoint,
                target,
                CONTENT_TYPE_AMZ_JSON,
                &payload,
                Utc::now(),
            )
            .map_err(|e| CallError::Transport(format!("request signing failed: {e}")))?;
            request = request
                .header("X-Amz-Date", headers.amz_date)
                .header("Authorization", headers.authorization);
        }

        let response = request
            .body(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CallError::Transport("request timed out".to_string())
                } else {
                    CallError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;

        if status.is_success() {
            // AdminConfirmSignUp answers with an empty body
            if text.trim().is_empty() {
                return Ok(json!({}));
            }
            return serde_json::from_str(&text).map_err(|e| CallError::Transport(e.to_string()));
        }

        match parse_api_error(&text) {
            Some((error_type, message)) => {
                debug!("{target} failed: {error_type}: {message}");
                Err(CallError::Api {
                    error_type,
                    message,
                })
            }
            None => Err(CallError::Transport(format!(
                "unexpected {status} response from identity backend"
            ))),
        }
    }
}

#[async_trait]
impl IdentityBackend for CognitoClient {
    async fn authenticate(&self, credentials: &Credentials) -> Result<IdentityResult, AuthError> {
        let body = json!({
            "AuthFlow": "USER_PASSWORD_AUTH",
            "ClientId": self.client_id,
            "AuthParameters": {
                "USERNAME": credentials.identifier,
                "PASSWORD": credentials.secret,
            },
        });

        let value = self
            .call(TARGET_INITIATE_AUTH, &body, false)
            .await
            .map_err(|e| match e {
                CallError::Transport(msg) => AuthError::BackendUnavailable(msg),
                CallError::Api { error_type, .. } => map_initiate_auth_error(&error_type),
            })?;

        let response: AuthFlowResponse = deserialize_response(value)?;
        parse_identity_result(response)
    }

    async fn respond_to_challenge(
        &self,
        identifier: &str,
        secret: &str,
        kind: &ChallengeKind,
        continuation: &str,
    ) -> Result<IdentityResult, AuthError> {
        // The new password slot is filled with the submitted secret; the
        // login flow documents this trade-off.
        let body = json!({
            "ChallengeName": kind.name(),
            "ClientId": self.client_id,
            "ChallengeResponses": {
                "USERNAME": identifier,
                "PASSWORD": secret,
                "NEW_PASSWORD": secret,
            },
            "Session": continuation,
        });

        let value = self
            .call(TARGET_RESPOND_TO_CHALLENGE, &body, false)
            .await
            .map_err(|e| match e {
                CallError::Transport(msg) => AuthError::BackendUnavailable(msg),
                CallError::Api {
                    error_type,
                    message,
                } => {
                    warn!("challenge response rejected: {error_type}");
                    AuthError::ChallengeRejected(message)
                }
            })?;

        let response: AuthFlowResponse = deserialize_response(value)?;
        match parse_identity_result(response) {
            Ok(IdentityResult::Authenticated(tokens)) => {
                Ok(IdentityResult::Authenticated(tokens))
            }
            // A second challenge (or no tokens at all) means the response
            // did not satisfy the challenge
            Ok(IdentityResult::ChallengePending { kind, .. }) => Err(
                AuthError::ChallengeRejected(format!("further challenge required: {}", kind.name())),
            ),
            Err(AuthError::InvalidCredentials) => Err(AuthError::ChallengeRejected(
                "challenge not satisfied".to_string(),
            )),
            Err(other) => Err(other),
        }
    }

    async fn register(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<RegistrationReceipt, AuthError> {
        let body = json!({
            "ClientId": self.client_id,
            "Username": identifier,
            "Password": secret,
            "UserAttributes": [
                { "Name": "email", "Value": identifier },
            ],
        });

        let value = self
            .call(TARGET_SIGN_UP, &body, false)
            .await
            .map_err(|e| match e {
                CallError::Transport(msg) => AuthError::BackendUnavailable(msg),
                CallError::Api { error_type, .. } => map_sign_up_error(&error_type),
            })?;

        let response: SignUpResponse = deserialize_response(value)?;
        Ok(RegistrationReceipt {
            user_sub: response.user_sub,
        })
    }

    async fn confirm_registration(&self, identifier: &str) -> Result<(), AuthError> {
        let body = json!({
            "UserPoolId": self.user_pool_id,
            "Username": identifier,
        });

        self.call(TARGET_ADMIN_CONFIRM_SIGN_UP, &body, true)
            .await
            .map_err(|e| match e {
                CallError::Transport(msg) => AuthError::BackendUnavailable(msg),
                CallError::Api {
                    error_type,
                    message,
                } => AuthError::BackendUnavailable(format!("{error_type}: {message}")),
            })?;

        Ok(())
    }
}

/// `InitiateAuth` error translation. Anything that means "this credential
/// pair does not sign in" maps to `InvalidCredentials`; the rest is backend
/// trouble.
fn map_initiate_auth_error(error_type: &str) -> AuthError {
    match error_type {
        "NotAuthorizedException"
        | "UserNotFoundException"
        | "UserNotConfirmedException"
        | "PasswordResetRequiredException" => AuthError::InvalidCredentials,
        other => AuthError::BackendUnavailable(other.to_string()),
    }
}

/// `SignUp` error translation
fn map_sign_up_error(error_type: &str) -> AuthError {
    match error_type {
        "UsernameExistsException" => AuthError::IdentifierTaken,
        "InvalidPasswordException" => AuthError::WeakSecret,
        "InvalidParameterException" => AuthError::InvalidFormat,
        other => AuthError::BackendUnavailable(other.to_string()),
    }
}

/// Interpret an auth-flow response: either issued tokens or a pending
/// challenge. A response with neither is treated as a failed sign-in.
fn parse_identity_result(response: AuthFlowResponse) -> Result<IdentityResult, AuthError> {
    if let (Some(challenge_name), Some(session)) = (response.challenge_name, response.session) {
        return Ok(IdentityResult::ChallengePending {
            kind: ChallengeKind::from_name(&challenge_name),
            continuation: session,
        });
    }

    match response.authentication_result {
        Some(result) => Ok(IdentityResult::Authenticated(ProviderTokens {
            access_token: result.access_token,
            id_token: result.id_token,
            refresh_token: result.refresh_token,
        })),
        None => Err(AuthError::InvalidCredentials),
    }
}

fn deserialize_response<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, AuthError> {
    serde_json::from_value(value).map_err(|e| {
        AuthError::BackendUnavailable(format!("malformed backend response: {e}"))
    })
}

/// Extract the `__type` and message from a Cognito error body, stripping
/// the namespace prefix some responses carry (`com.amazon...#TypeName`).
fn parse_api_error(body: &str) -> Option<(String, String)> {
    let parsed: ApiErrorBody = serde_json::from_str(body).ok()?;
    let error_type = parsed.error_type?;
    let error_type = error_type
        .rsplit('#')
        .next()
        .unwrap_or(&error_type)
        .to_string();
    Some((error_type, parsed.message.unwrap_or_default()))
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthFlowResponse {
    authentication_result: Option<AuthenticationResult>,
    challenge_name: Option<String>,
    session: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: String,
    id_token: String,
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignUpResponse {
    user_sub: Uuid,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    #[serde(rename = "message", alias = "Message")]
    message: Option<String>,
}
