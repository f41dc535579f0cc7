#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use notegate::{
    cognito::CognitoClient,
    flow::AuthFlow,
    handlers::{health, login, proxy_upstream, register, session_info, sign_out},
    session::SessionManager,
    settings::NotegateSettings,
};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = NotegateSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    // Wire the identity backend adapter and the flow orchestrator
    let backend = CognitoClient::from_settings(&settings.cognito)
        .map_err(|e| std::io::Error::other(format!("Failed to initialize identity backend: {e}")))?;
    let flow = AuthFlow::new(Arc::new(backend));

    // Process-wide signing configuration, read-only after this point
    let session_manager = SessionManager::new(
        settings.session.session_secret.as_bytes(),
        settings.cookies.secure,
        settings.session.session_duration_hours,
    );

    start_server(flow, session_manager, settings).await
}

/// Start the server
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(
    flow: AuthFlow,
    session_manager: SessionManager,
    settings: NotegateSettings,
) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings);

    // Configure CORS for the SPA
    let cors_origins = settings.get_cors_origins();

    HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec!["Authorization", "Content-Type", "Accept"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(flow.clone()))
            .app_data(web::Data::new(settings.clone()))
            .app_data(web::Data::new(session_manager.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg
        // Credential exchange endpoints
        .route("/auth/login", web::post().to(login))
        .route("/auth/register", web::post().to(register))
        .route("/auth/sign_out", web::get().to(sign_out))
        .route("/auth/sign_out", web::post().to(sign_out))
        .route("/auth/session", web::get().to(session_info))
        // Health endpoint
        .route("/ping", web::get().to(health))
        // Catch-all proxy for any other path - forwarded to the notes API
        // with the session's bearer token attached
        .default_service(
            web::route()
                .guard(actix_web::guard::fn_guard(|req| {
                    let path = req.head().uri.path();
                    !path.starts_with("/auth") && !path.starts_with("/ping")
                }))
                .to(proxy_upstream),
        );
}

fn print_startup_info(bind_address: &str, settings: &NotegateSettings) {
    println!("Starting notegate on http://{bind_address}");
    println!();
    println!("Auth endpoints:");
    println!("  POST /auth/login     - Exchange credentials for a session");
    println!("  POST /auth/register  - Register a new account");
    println!("  GET|POST /auth/sign_out - Clear session");
    println!("  GET  /auth/session   - Current session info");
    println!();
    println!("Proxy endpoints (with bearer token injection):");
    println!("  ALL {{any path}}       - Proxy to the notes API as-is");
    println!("                        (except /auth/* and /ping)");
    println!("                        Upstream URL: {}", settings.proxy.upstream_url);
    println!();
    println!("System endpoints:");
    println!("  GET  /ping            - Health check");
}
