//! HTTP handlers
//!
//! The inbound surface of the credential-exchange service plus the
//! authenticated reverse proxy to the notes API.
//!
//! # Modules
//!
//! - [`auth`] - login, sign-out and session introspection
//! - [`register`] - registration
//! - [`health`] - health check
//! - [`proxy`] - bearer-forwarding proxy to the notes-storage API

pub mod auth;
pub mod health;
pub mod proxy;
pub mod register;

pub use auth::{login, session_info, sign_out};
pub use health::health;
pub use proxy::proxy_upstream;
pub use register::register;
