//! # Domain Layer
//!
//! The domain layer contains the core business logic of the chat server.
//! It is independent of any external frameworks or infrastructure concerns.
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Membership rules live on the `Chat` entity
//! - Repository and media-store traits define data access contracts

pub mod entities;

// Re-export commonly used types
pub use entities::*;
