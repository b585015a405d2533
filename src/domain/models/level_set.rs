//! Final ordered level collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::grade::Grade;

/// One generated level at its final curve position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    /// 0-based position on the curve.
    pub position: usize,
    pub name: String,
    pub artifact: serde_json::Value,
    pub actual_difficulty: f64,
    pub grade: Grade,
    pub target_difficulty: f64,
    /// Task that produced the artifact (generation order).
    pub source_task_index: usize,
}

/// Deviation between target curve and assigned artifacts, before and after reordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReorderReport {
    /// Sum of `|target - actual|` pairing artifacts in generation order.
    pub deviation_before: f64,
    /// Sum of `|target - actual|` after rank matching.
    pub deviation_after: f64,
    pub mean_deviation_after: f64,
    /// `deviation_before - deviation_after`, never negative.
    pub improvement: f64,
}

/// Ordered, named set of successful levels plus curve metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSet {
    pub id: Uuid,
    pub name: String,
    pub levels: Vec<Level>,
    /// Dense target curve the set was planned against.
    pub difficulty_profile: Vec<f64>,
    pub actual_difficulties: Vec<f64>,
    pub grades: Vec<Grade>,
    /// Parameters the set was generated with.
    pub generation_config: serde_json::Value,
    pub reorder: ReorderReport,
    /// Tasks that ended failed and were dropped.
    pub failed_count: usize,
    pub created_at: DateTime<Utc>,
    /// Identifier assigned by the persistence sink, if stored.
    pub storage_id: Option<String>,
}

impl LevelSet {
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}
