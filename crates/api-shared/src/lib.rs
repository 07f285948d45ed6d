//! # API Shared
//!
//! Shared definitions for the ABG APIs.
//!
//! Contains:
//! - Wire types (`dto` module) with OpenAPI schemas
//! - Shared services like `HealthService`
//! - Identity extraction from request metadata
//!
//! Used by `api-rest` and the workspace binary.

pub mod auth;
pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
