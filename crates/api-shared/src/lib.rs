//! # API Shared
//!
//! Shared definitions for the hospital service APIs.
//!
//! Contains:
//! - Wire request/response types (`dto` module), with OpenAPI schemas
//! - Shared services like `HealthService`
//! - Bearer-token header parsing
//!
//! Used by `hms-core` (request bodies are the inputs of core operations), `api-rest` and the
//! CLI.

pub mod auth;
pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
