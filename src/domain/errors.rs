//! Domain errors for the Levelforge orchestration engine.

use thiserror::Error;

/// Domain-level errors that can occur while orchestrating a run.
///
/// Individual task failures are not errors at this level; they are recorded
/// on the task's `ArtifactResult` and the run continues.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition { from: String, to: String, reason: String },

    #[error("Generation plan covers {planned} levels but the curve has {expected}")]
    PlanMismatch { planned: usize, expected: usize },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Run produced no successful levels ({failed} tasks failed)")]
    NoSuccessfulLevels { failed: usize },

    #[error("Run was cancelled")]
    Cancelled,

    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    #[error("Level set not found: {0}")]
    LevelSetNotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for DomainError {
    fn from(err: tokio::task::JoinError) -> Self {
        DomainError::ExecutionFailed(err.to_string())
    }
}
