//! HTTP Handlers
//!
//! Request handlers for all HTTP endpoints.

pub mod admin;
pub mod auth;
pub mod chat;
pub mod health;
pub mod user;
