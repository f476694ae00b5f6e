//! Middleware
//!
//! Tower middleware for request processing.

pub mod auth;
pub mod cors;
pub mod logging;

pub use auth::{admin_middleware, auth_middleware, AuthUser, ADMIN_COOKIE, USER_COOKIE};
