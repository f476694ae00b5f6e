//! # Chatline
//!
//! Real-time chat backend with:
//! - Cookie-authenticated REST API for accounts, friend requests, chats and history
//! - WebSocket transport for message fan-out, typing indicators and presence
//! - PostgreSQL for persistent storage
//! - Local media storage for avatars and attachments
//! - Admin dashboard endpoints
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Core entities and repository/media traits
//! - **Application Layer**: Business logic services and DTOs
//! - **Infrastructure Layer**: Database, media store and metrics
//! - **Presentation Layer**: HTTP handlers and the WebSocket gateway
//!
//! ## Module Structure
//!
//! ```text
//! chatline/
//! +-- config/         Configuration management
//! +-- domain/         Domain entities and traits
//! +-- application/    Application services, DTOs and event publishing
//! +-- infrastructure/ Database, media and metrics implementations
//! +-- presentation/   HTTP routes and WebSocket handlers
//! +-- shared/         Common utilities (errors, snowflake IDs, validation)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
