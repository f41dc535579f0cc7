//! HTTP response helpers
//!
//! Unified construction of JSON error responses so handlers and the proxy
//! return a consistent `{error, error_description}` shape.

use actix_web::{http::header, HttpResponse, HttpResponseBuilder};
use serde_json::json;

/// Unified response builder for error responses
pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Create a `BadRequest` (400) error response
    #[must_use]
    pub fn bad_request(error: &str, description: &str) -> HttpResponse {
        Self::json_error(HttpResponse::BadRequest(), error, description)
    }

    /// Create an `Unauthorized` (401) error response
    #[must_use]
    pub fn unauthorized() -> HttpResponse {
        Self::json_error(
            HttpResponse::Unauthorized(),
            "unauthorized",
            "Authentication is required to access this resource",
        )
    }

    /// Create an `Unauthorized` (401) error response with a specific reason
    #[must_use]
    pub fn unauthorized_with(error: &str, description: &str) -> HttpResponse {
        Self::json_error(HttpResponse::Unauthorized(), error, description)
    }

    /// Create an `InternalServerError` (500) error response
    #[must_use]
    pub fn internal_server_error(description: &str) -> HttpResponse {
        Self::json_error(
            HttpResponse::InternalServerError(),
            "server_error",
            description,
        )
    }

    /// Create a `BadGateway` (502) error response
    #[must_use]
    pub fn bad_gateway() -> HttpResponse {
        Self::json_error(
            HttpResponse::BadGateway(),
            "bad_gateway",
            "Failed to connect to upstream server",
        )
    }

    fn json_error(
        mut builder: HttpResponseBuilder,
        error: &str,
        description: &str,
    ) -> HttpResponse {
        builder
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .json(json!({
                "error": error,
                "error_description": description,
            }))
    }
}
