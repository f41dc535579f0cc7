// Authentication handlers: login, sign-out and session introspection
use crate::cognito::AuthError;
use crate::flow::AuthFlow;
use crate::models::Credentials;
use crate::session::{SessionError, SessionManager};
use crate::utils::responses::ResponseBuilder;
use actix_web::{web, HttpRequest, HttpResponse, Result};
use log::{error, warn};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login handler: one credential exchange, yielding a session cookie.
///
/// # Errors
///
/// Never fails at the actix level; flow failures become structured JSON
/// error responses.
pub async fn login(
    body: web::Json<LoginRequest>,
    flow: web::Data<AuthFlow>,
    session_manager: web::Data<SessionManager>,
) -> Result<HttpResponse> {
    if body.email.is_empty() || body.password.is_empty() {
        return Ok(ResponseBuilder::bad_request(
            "invalid_request",
            "Email and password are required",
        ));
    }

    let credentials = Credentials::new(body.email.clone(), body.password.clone());
    let session = match flow.login(&credentials).await {
        Ok(session) => session,
        Err(err) => return Ok(login_error_response(&err)),
    };

    match session_manager.issue_cookie(&session) {
        Ok(cookie) => Ok(HttpResponse::Ok().cookie(cookie).json(json!({
            "user": {
                "id": session.subject,
                "name": session.display_name,
                "email": session.subject,
            }
        }))),
        Err(err) => {
            error!("failed to issue session: {err}");
            Ok(ResponseBuilder::internal_server_error(
                "Failed to issue session",
            ))
        }
    }
}

/// Sign out by expiring the session cookie. The token itself is simply
/// discarded by the client; there is no server-side revocation list.
pub async fn sign_out(session_manager: web::Data<SessionManager>) -> HttpResponse {
    HttpResponse::Ok()
        .cookie(session_manager.sign_out_cookie())
        .json(json!({ "message": "Signed out" }))
}

/// Session introspection: decode the presented cookie back into the
/// authenticated user.
pub async fn session_info(
    req: HttpRequest,
    session_manager: web::Data<SessionManager>,
) -> HttpResponse {
    match session_manager.session_from_request(&req) {
        Ok(Some(session)) => HttpResponse::Ok().json(json!({
            "user": {
                "id": session.subject,
                "name": session.display_name,
                "email": session.subject,
            }
        })),
        Ok(None) => ResponseBuilder::unauthorized(),
        Err(err) => session_error_response(&err),
    }
}

/// Translate flow failures into responses. Only the login-relevant variants
/// are expected here; the rest are mapped defensively to 400.
fn login_error_response(err: &AuthError) -> HttpResponse {
    match err {
        AuthError::InvalidCredentials => ResponseBuilder::unauthorized_with(
            "invalid_credentials",
            "Incorrect email or password",
        ),
        AuthError::ChallengeRejected(_) => ResponseBuilder::unauthorized_with(
            "challenge_rejected",
            "Sign-in challenge could not be completed",
        ),
        AuthError::BackendUnavailable(msg) => {
            error!("identity backend unavailable during login: {msg}");
            ResponseBuilder::bad_gateway()
        }
        AuthError::IdentifierTaken | AuthError::WeakSecret | AuthError::InvalidFormat => {
            warn!("unexpected registration error during login: {err}");
            ResponseBuilder::bad_request("invalid_request", &err.to_string())
        }
    }
}

/// 401 with the decode failure spelled out
pub(crate) fn session_error_response(err: &SessionError) -> HttpResponse {
    let reason = match err {
        SessionError::Expired => "session_expired",
        SessionError::Malformed => "session_malformed",
        SessionError::SignatureInvalid => "session_signature_invalid",
    };
    ResponseBuilder::unauthorized_with(reason, &err.to_string())
}
