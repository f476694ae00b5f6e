//! HTTP API tests

mod admin_tests;
mod auth_tests;
mod health_tests;
