//! Test utilities for notegate
//!
//! Available to unit tests and, behind the `testing` feature, to the
//! integration test suites.
//!
//! # Modules
//!
//! - [`constants`] - shared test data values
//! - [`fixtures`] - pre-built test objects
//! - [`mock`] - identity backend doubles: a scripted mock and an in-memory
//!   user pool

pub mod constants;
pub mod fixtures;
pub mod mock;

pub use constants::{TEST_EMAIL, TEST_PASSWORD, TEST_SESSION_SECRET};
pub use fixtures::TestFixtures;
pub use mock::{InMemoryUserPool, MockIdentityBackend};
