// Registration handler
use crate::cognito::AuthError;
use crate::flow::AuthFlow;
use crate::utils::responses::ResponseBuilder;
use actix_web::{web, HttpResponse, Result};
use log::error;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Registration handler: local validation, sign-up, auto-confirm.
///
/// Registration never yields a session; the client follows up with a login
/// using the same credentials.
///
/// # Errors
///
/// Never fails at the actix level; flow failures become structured JSON
/// error responses.
pub async fn register(
    body: web::Json<RegisterRequest>,
    flow: web::Data<AuthFlow>,
) -> Result<HttpResponse> {
    if body.email.is_empty() || body.password.is_empty() {
        return Ok(ResponseBuilder::bad_request(
            "invalid_request",
            "Email and password are required",
        ));
    }

    match flow.register(&body.email, &body.password).await {
        Ok(receipt) => Ok(HttpResponse::Ok().json(json!({
            "message": "User created successfully",
            "user_sub": receipt.user_sub,
        }))),
        Err(err) => Ok(register_error_response(&err)),
    }
}

/// Error mapping for registration failures
fn register_error_response(err: &AuthError) -> HttpResponse {
    match err {
        AuthError::IdentifierTaken => ResponseBuilder::bad_request(
            "identifier_taken",
            "An account with this email already exists",
        ),
        AuthError::WeakSecret => ResponseBuilder::bad_request(
            "weak_password",
            "Password does not meet requirements",
        ),
        AuthError::InvalidFormat => ResponseBuilder::bad_request(
            "invalid_format",
            "Invalid email or password format",
        ),
        AuthError::BackendUnavailable(msg) => {
            error!("identity backend unavailable during registration: {msg}");
            ResponseBuilder::internal_server_error(
                "Failed to create account. Please try again.",
            )
        }
        AuthError::InvalidCredentials | AuthError::ChallengeRejected(_) => {
            ResponseBuilder::internal_server_error(
                "Failed to create account. Please try again.",
            )
        }
    }
}
