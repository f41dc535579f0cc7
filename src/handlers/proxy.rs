//! Authenticated reverse proxy to the notes-storage API
//!
//! Every forwarded request carries the session's identity token as a bearer
//! credential in the `Authorization` header - the one integration contract
//! promised to the upstream. Requests without a decodable session never
//! reach the upstream.

use crate::session::cookie::filter_session_cookie;
use crate::session::SessionManager;
use crate::settings::NotegateSettings;
use crate::utils::responses::ResponseBuilder;
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use log::{debug, warn};
use once_cell::sync::Lazy;

use super::auth::session_error_response;

/// Shared HTTP client for upstream requests
static CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

/// Forward an authenticated request to the notes API.
///
/// # Errors
///
/// Never fails at the actix level; session and upstream failures become
/// structured JSON error responses.
pub async fn proxy_upstream(
    req: HttpRequest,
    body: web::Bytes,
    session_manager: web::Data<SessionManager>,
    settings: web::Data<NotegateSettings>,
) -> ActixResult<HttpResponse> {
    // Only requests with a decodable session reach the upstream
    let session = match session_manager.session_from_request(&req) {
        Ok(Some(session)) => session,
        Ok(None) => return Ok(ResponseBuilder::unauthorized()),
        Err(err) => return Ok(session_error_response(&err)),
    };

    let upstream_url = build_upstream_url(&settings.proxy.upstream_url, &req);

    let Ok(method) = reqwest::Method::from_bytes(req.method().as_str().as_bytes()) else {
        return Ok(ResponseBuilder::bad_request(
            "invalid_request",
            "Unsupported HTTP method",
        ));
    };

    debug!("proxying {} {} for {}", req.method(), req.path(), session.subject);

    let mut request_builder = CLIENT
        .request(method, &upstream_url)
        .header("Authorization", format!("Bearer {}", session.bearer_token()))
        .header("User-Agent", concat!("notegate/", env!("CARGO_PKG_VERSION")));

    // Forward content negotiation headers as-is
    for name in ["Content-Type", "Accept"] {
        if let Some(value) = req.headers().get(name) {
            request_builder = request_builder.header(name, value.as_bytes());
        }
    }

    // Forward remaining cookies, with the session cookie stripped so the
    // signed token never leaves this process
    if let Some(cookie_header) = req.headers().get("Cookie") {
        if let Ok(cookie_str) = cookie_header.to_str() {
            if let Some(filtered) = filter_session_cookie(cookie_str) {
                request_builder = request_builder.header("Cookie", filtered);
            }
        }
    }

    let upstream_response = match request_builder.body(body.to_vec()).send().await {
        Ok(response) => response,
        Err(err) => {
            warn!("upstream request failed: {err}");
            return Ok(ResponseBuilder::bad_gateway());
        }
    };

    forward_response(upstream_response).await
}

/// Join the configured upstream base with the request path and query
fn build_upstream_url(upstream_base: &str, req: &HttpRequest) -> String {
    let base = upstream_base.trim_end_matches('/');
    let path = req.path();
    let query = req.query_string();

    if query.is_empty() {
        format!("{base}{path}")
    } else {
        format!("{base}{path}?{query}")
    }
}

/// Relay status, content type and body of the upstream response
async fn forward_response(upstream_response: reqwest::Response) -> ActixResult<HttpResponse> {
    let status = StatusCode::from_u16(upstream_response.status().as_u16())
        .unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = HttpResponse::build(status);

    if let Some(content_type) = upstream_response.headers().get("Content-Type") {
        builder.insert_header(("Content-Type", content_type.as_bytes()));
    }

    match upstream_response.bytes().await {
        Ok(bytes) => Ok(builder.body(bytes)),
        Err(err) => {
            warn!("failed to read upstream response body: {err}");
            Ok(ResponseBuilder::bad_gateway())
        }
    }
}
