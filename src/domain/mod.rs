//! Domain layer for the Levelforge orchestration engine
//!
//! This module contains the curve, grading, planning and lifecycle models
//! plus the ports the engine consumes.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{DomainError, DomainResult};
