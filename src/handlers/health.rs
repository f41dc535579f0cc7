// Health check handler
use crate::models::HealthResponse;
use actix_web::HttpResponse;

/// Health endpoint
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        message: format!("notegate {} is healthy", crate::VERSION),
    })
}
