//! Shared types for the farm-to-table marketplace
//!
//! Common types used across crates: domain models, error types,
//! response structures, and role definitions.

pub mod error;
pub mod models;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use models::Role;
