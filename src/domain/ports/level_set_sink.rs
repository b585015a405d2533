//! Level set sink port - storage for finished, ordered level sets.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::LevelSet;

/// Listing entry for a stored level set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSetSummary {
    pub id: String,
    pub name: String,
    pub level_count: usize,
    pub mean_deviation: f64,
    pub created_at: DateTime<Utc>,
}

/// Persistence target for completed level sets.
#[async_trait]
pub trait LevelSetSink: Send + Sync {
    /// Store a set and return its storage identifier.
    async fn persist(&self, set: &LevelSet) -> DomainResult<String>;

    /// List stored sets, newest first.
    async fn list(&self) -> DomainResult<Vec<LevelSetSummary>>;
}
