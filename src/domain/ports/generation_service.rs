//! Generation service port - interface for the external level generator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::models::Grade;

/// Parameters for a single generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Requested difficulty in `[0, 1]`.
    pub target_difficulty: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gimmick_intensity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_gimmicks: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlock_level_number: Option<usize>,
    /// Opaque shape parameters forwarded as-is.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub shape_params: serde_json::Value,
}

impl GenerationRequest {
    pub fn new(target_difficulty: f64) -> Self {
        Self {
            target_difficulty,
            gimmick_intensity: None,
            available_gimmicks: None,
            unlock_level_number: None,
            shape_params: serde_json::Value::Null,
        }
    }
}

/// A generated artifact with its measured difficulty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub artifact: serde_json::Value,
    pub actual_difficulty: f64,
    pub grade: Grade,
}

/// Transport or service failures. Every variant is retried with backoff.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Trait for level generation backends.
///
/// Implementations may be non-deterministic: the same request can yield
/// artifacts of different measured difficulty.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Generate one artifact for the request.
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError>;
}
