//! Single-set pipeline: curve → plan → dispatch → reorder → [`LevelSet`].

use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use super::curve_matcher::CurveMatcher;
use super::dispatcher::{DispatchContext, GenerationDispatcher};
use super::progress_tracker::RunProgressTracker;
use crate::domain::errors::DomainResult;
use crate::domain::models::{DifficultyCurve, GenerationPlan, LevelSet};

/// Everything needed to produce one level set.
#[derive(Debug, Clone)]
pub struct SetRequest {
    pub name: String,
    pub level_count: usize,
    pub curve: DifficultyCurve,
    /// Global index of this set's first task.
    pub global_offset: usize,
    /// Levels across the whole run.
    pub total_count: usize,
    pub shape_params: serde_json::Value,
    /// Stored verbatim on the resulting set.
    pub generation_config: serde_json::Value,
}

impl SetRequest {
    /// Standalone set: no offset, total equals its own size.
    pub fn single(name: impl Into<String>, level_count: usize, curve: DifficultyCurve) -> Self {
        Self {
            name: name.into(),
            level_count,
            curve,
            global_offset: 0,
            total_count: level_count,
            shape_params: serde_json::Value::Null,
            generation_config: serde_json::Value::Null,
        }
    }
}

/// Result of running one set.
#[derive(Debug, Clone)]
pub struct SetRun {
    pub level_set: LevelSet,
    pub success: usize,
    pub failed: usize,
    /// Stopped early; `level_set` holds only what finished.
    pub cancelled: bool,
}

/// Dense curve and validated plan for a set.
pub fn plan_set(curve: &DifficultyCurve, level_count: usize) -> DomainResult<(Vec<f64>, GenerationPlan)> {
    let dense = curve.dense(level_count);
    let plan = GenerationPlan::from_curve(&dense);
    plan.validate(level_count)?;
    Ok((dense, plan))
}

/// Runs the generation pipeline for one set.
#[derive(Clone)]
pub struct LevelSetPipeline {
    dispatcher: GenerationDispatcher,
}

impl LevelSetPipeline {
    pub const fn new(dispatcher: GenerationDispatcher) -> Self {
        Self { dispatcher }
    }

    pub const fn dispatcher(&self) -> &GenerationDispatcher {
        &self.dispatcher
    }

    pub async fn run(
        &self,
        request: &SetRequest,
        tracker: &Arc<RunProgressTracker>,
        cancel: &CancellationToken,
    ) -> DomainResult<SetRun> {
        let (dense, plan) = plan_set(&request.curve, request.level_count)?;
        info!(
            set = %request.name,
            levels = request.level_count,
            plan_items = plan.items().len(),
            "planned level set"
        );

        let context = DispatchContext {
            total_count: request.total_count,
            shape_params: request.shape_params.clone(),
        };
        let outcome = self
            .dispatcher
            .dispatch(plan.tasks(request.global_offset), &context, tracker, cancel)
            .await?;

        let matched = CurveMatcher::match_to_curve(&outcome.results, &dense);
        info!(
            set = %request.name,
            placed = matched.levels.len(),
            deviation_before = matched.report.deviation_before,
            deviation_after = matched.report.deviation_after,
            "levels matched to curve"
        );

        let level_set = LevelSet {
            id: Uuid::new_v4(),
            name: request.name.clone(),
            actual_difficulties: matched.levels.iter().map(|l| l.actual_difficulty).collect(),
            grades: matched.levels.iter().map(|l| l.grade).collect(),
            levels: matched.levels,
            difficulty_profile: dense,
            generation_config: request.generation_config.clone(),
            reorder: matched.report,
            failed_count: outcome.failed_count(),
            created_at: Utc::now(),
            storage_id: None,
        };

        Ok(SetRun {
            success: outcome.success_count(),
            failed: outcome.failed_count(),
            cancelled: outcome.cancelled,
            level_set,
        })
    }
}
