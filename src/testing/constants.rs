//! Shared constant values used across test suites

pub const TEST_EMAIL: &str = "user@example.com";
pub const TEST_PASSWORD: &str = "Str0ng!pass";
pub const TEST_SESSION_SECRET: &str = "test-session-secret-with-enough-entropy";

pub const TEST_ACCESS_TOKEN: &str = "test-access-token";
pub const TEST_ID_TOKEN: &str = "test-id-token";
pub const TEST_REFRESH_TOKEN: &str = "test-refresh-token";
pub const TEST_CONTINUATION: &str = "test-challenge-continuation";
