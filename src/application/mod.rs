//! Application Layer
//!
//! Contains business logic services, data transfer objects (DTOs) and the
//! real-time event port. This layer orchestrates the flow of data between
//! the presentation and domain layers.

pub mod dto;
pub mod events;
pub mod services;
