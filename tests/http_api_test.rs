//! HTTP surface tests: the auth endpoints wired into an actix app
//!
//! Requires the `testing` feature for access to the backend doubles.

use actix_web::{test, web, App};
use notegate::flow::AuthFlow;
use notegate::handlers::{health, login, proxy_upstream, register, session_info, sign_out};
use notegate::session::COOKIE_NAME;
use notegate::testing::{InMemoryUserPool, TestFixtures, TEST_EMAIL, TEST_PASSWORD};
use serde_json::{json, Value};
use std::sync::Arc;

macro_rules! test_app {
    ($pool:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AuthFlow::new($pool.clone())))
                .app_data(web::Data::new(TestFixtures::session_manager()))
                .app_data(web::Data::new(TestFixtures::settings()))
                .route("/auth/login", web::post().to(login))
                .route("/auth/register", web::post().to(register))
                .route("/auth/sign_out", web::post().to(sign_out))
                .route("/auth/session", web::get().to(session_info))
                .route("/ping", web::get().to(health))
                .default_service(web::route().to(proxy_upstream)),
        )
        .await
    };
}

fn pool() -> Arc<InMemoryUserPool> {
    Arc::new(InMemoryUserPool::new())
}

#[actix_web::test]
async fn test_health_endpoint() {
    let app = test_app!(pool());

    let resp = test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
    assert!(resp.status().is_success());

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn test_register_login_session_journey() {
    let app = test_app!(pool());

    // Register
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({ "email": TEST_EMAIL, "password": TEST_PASSWORD }))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "User created successfully");
    assert!(body["user_sub"].is_string());

    // Login with the same credentials
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({ "email": TEST_EMAIL, "password": TEST_PASSWORD }))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == COOKIE_NAME)
        .expect("session cookie set on login")
        .into_owned();
    assert!(!cookie.value().is_empty());

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["email"], TEST_EMAIL);

    // Present the session cookie back
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/auth/session")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["id"], TEST_EMAIL);
}

#[actix_web::test]
async fn test_login_rejects_bad_password() {
    let backend = pool();
    backend.seed_user(TEST_EMAIL, TEST_PASSWORD);
    let app = test_app!(backend);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({ "email": TEST_EMAIL, "password": "Wrong1!pass" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 401);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_credentials");
}

#[actix_web::test]
async fn test_register_duplicate_email() {
    let backend = pool();
    backend.seed_user(TEST_EMAIL, TEST_PASSWORD);
    let app = test_app!(backend);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({ "email": TEST_EMAIL, "password": TEST_PASSWORD }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "identifier_taken");
    assert_eq!(
        body["error_description"],
        "An account with this email already exists"
    );
}

#[actix_web::test]
async fn test_register_weak_password() {
    let app = test_app!(pool());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({ "email": TEST_EMAIL, "password": "Weak1!a" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "weak_password");
}

#[actix_web::test]
async fn test_register_empty_fields() {
    let app = test_app!(pool());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({ "email": "", "password": "" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_request");
}

#[actix_web::test]
async fn test_session_endpoint_without_cookie() {
    let app = test_app!(pool());

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/auth/session").to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 401);
}

#[actix_web::test]
async fn test_session_endpoint_with_garbage_cookie() {
    let app = test_app!(pool());

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/auth/session")
            .cookie(actix_web::cookie::Cookie::new(COOKIE_NAME, "garbage"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 401);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "session_malformed");
}

#[actix_web::test]
async fn test_sign_out_expires_cookie() {
    let app = test_app!(pool());

    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri("/auth/sign_out").to_request(),
    )
    .await;
    assert!(resp.status().is_success());

    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == COOKIE_NAME)
        .expect("expired session cookie set on sign-out");
    assert!(cookie.value().is_empty());
    assert!(cookie.max_age().unwrap().whole_seconds() < 0);
}

#[actix_web::test]
async fn test_proxy_requires_session() {
    let app = test_app!(pool());

    // No cookie: the request is refused before any upstream contact
    let resp = test::call_service(&app, test::TestRequest::get().uri("/notes").to_request()).await;
    assert_eq!(resp.status().as_u16(), 401);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "unauthorized");
}
