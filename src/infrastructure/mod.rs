//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Database pool, migrations and repositories (PostgreSQL)
//! - Local-disk media storage
//! - Prometheus metrics

pub mod database;
pub mod media;
pub mod metrics;
pub mod repositories;
