//! Generation tasks and their results.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::grade::Grade;
use super::plan::GenerationPlanItem;

/// One unit of generation work plus its mutable retry state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationTask {
    /// Index within the current set, `0..level_count`.
    pub task_index: usize,
    /// Index across the whole (possibly multi-set) run, drives gimmick progression.
    pub global_index: usize,
    pub plan: GenerationPlanItem,
    /// Grade-correction retries performed so far.
    pub retry_count: u32,
    /// Signed offset applied to the planned target difficulty.
    pub difficulty_adjustment: f64,
    /// Multiplier applied to the resolved gimmick intensity (1.0 = unchanged).
    pub gimmick_intensity_adjustment: f64,
}

impl GenerationTask {
    pub fn new(task_index: usize, global_index: usize, plan: GenerationPlanItem) -> Self {
        Self {
            task_index,
            global_index,
            plan,
            retry_count: 0,
            difficulty_adjustment: 0.0,
            gimmick_intensity_adjustment: 1.0,
        }
    }

    /// 1-based level number used for gimmick unlocks.
    pub const fn level_number(&self) -> usize {
        self.global_index + 1
    }
}

/// Terminal status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Success,
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Outcome of one task after its retry loops finish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactResult {
    pub task_index: usize,
    pub artifact: Option<serde_json::Value>,
    pub actual_difficulty: f64,
    pub grade: Option<Grade>,
    pub planned_grade: Grade,
    pub planned_difficulty: f64,
    pub status: TaskStatus,
    /// Grade-correction retries spent.
    pub grade_retries: u32,
    /// Service-failure retries spent, summed over every call of the task.
    pub service_retries: u32,
    /// Accepted without reaching the planned or an adjacent grade.
    pub compromise: bool,
    pub error: Option<String>,
}

impl ArtifactResult {
    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success && self.artifact.is_some()
    }

    pub fn failed(task: &GenerationTask, service_retries: u32, error: impl Into<String>) -> Self {
        Self {
            task_index: task.task_index,
            artifact: None,
            actual_difficulty: 0.0,
            grade: None,
            planned_grade: task.plan.grade,
            planned_difficulty: task.plan.target_difficulty,
            status: TaskStatus::Failed,
            grade_retries: task.retry_count,
            service_retries,
            compromise: false,
            error: Some(error.into()),
        }
    }
}
