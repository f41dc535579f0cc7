//! Test fixtures providing pre-built test objects
//!
//! Commonly used test data and configurations, eliminating the need to
//! recreate the same objects in multiple test files.

use crate::flow::AuthFlow;
use crate::models::{Credentials, NotegateSession};
use crate::session::SessionManager;
use crate::settings::NotegateSettings;
use crate::testing::constants::{
    TEST_ACCESS_TOKEN, TEST_EMAIL, TEST_ID_TOKEN, TEST_PASSWORD, TEST_REFRESH_TOKEN,
    TEST_SESSION_SECRET,
};
use crate::testing::mock::InMemoryUserPool;
use std::sync::Arc;

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Standard credential pair
    #[must_use]
    pub fn credentials() -> Credentials {
        Credentials::new(TEST_EMAIL, TEST_PASSWORD)
    }

    /// Standard decoded session
    #[must_use]
    pub fn session() -> NotegateSession {
        NotegateSession {
            subject: TEST_EMAIL.to_string(),
            display_name: TEST_EMAIL.to_string(),
            access_token: TEST_ACCESS_TOKEN.to_string(),
            id_token: TEST_ID_TOKEN.to_string(),
            refresh_token: Some(TEST_REFRESH_TOKEN.to_string()),
        }
    }

    /// Session manager with default test configuration (insecure cookies,
    /// 24 hour sessions)
    #[must_use]
    pub fn session_manager() -> SessionManager {
        SessionManager::new(TEST_SESSION_SECRET.as_bytes(), false, 24)
    }

    /// Auth flow backed by a fresh in-memory user pool
    #[must_use]
    pub fn flow_with_pool() -> (AuthFlow, Arc<InMemoryUserPool>) {
        let pool = Arc::new(InMemoryUserPool::new());
        (AuthFlow::new(pool.clone()), pool)
    }

    /// Standard test settings
    #[must_use]
    pub fn settings() -> NotegateSettings {
        let mut settings = NotegateSettings::default();
        settings.application.cors_origins = "http://localhost:3000".to_string();
        settings.cognito.client_id = "test-client-id".to_string();
        settings.cognito.user_pool_id = "us-east-1_test".to_string();
        settings.session.session_secret = TEST_SESSION_SECRET.to_string();
        settings.cookies.secure = false;
        settings
    }
}
