//! Multi-set controller.
//!
//! Repeats the single-set pipeline over progressively harder copies of the
//! run's curve. Set `k` shifts every control point by
//! `k * difficulty_shift_per_set` and continues the global level numbering,
//! so gimmick unlocks and intensity keep ramping across the whole run.
//! Each finished set is persisted before the next one starts.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::pipeline::{LevelSetPipeline, SetRequest};
use super::progress_tracker::RunProgressTracker;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{LevelSet, RunConfig, RunStatus};
use crate::domain::ports::LevelSetSink;

/// Sets produced by a run, in generation order.
#[derive(Debug, Clone, Default)]
pub struct MultiSetRun {
    pub sets: Vec<LevelSet>,
    /// Cancellation stopped the run early.
    pub cancelled: bool,
    /// Sets that finished without a single successful level.
    pub empty_sets: usize,
    /// Failed tasks across every set, including empty ones.
    pub failed_tasks: usize,
}

/// Per-set requests for a run, with shifted curves and global offsets.
///
/// A run without `multi_set` yields one request carrying the run's own name.
pub fn set_requests(config: &RunConfig) -> Vec<SetRequest> {
    let generation_config = serde_json::to_value(config).unwrap_or(serde_json::Value::Null);

    let Some(multi) = config.multi_set else {
        return vec![SetRequest {
            shape_params: config.shape_params.clone(),
            generation_config,
            ..SetRequest::single(config.name.clone(), config.level_count, config.points.clone())
        }];
    };

    let set_count = multi.set_count.max(1);
    (0..set_count)
        .map(|k| SetRequest {
            name: format!("{} #{}", config.name, k + 1),
            level_count: config.level_count,
            curve: config
                .points
                .shifted(k as f64 * multi.difficulty_shift_per_set, multi.max_difficulty_clamp),
            global_offset: k * config.level_count,
            total_count: set_count * config.level_count,
            shape_params: config.shape_params.clone(),
            generation_config: generation_config.clone(),
        })
        .collect()
}

/// Drives the pipeline once per set and persists each result.
#[derive(Clone)]
pub struct MultiSetController {
    pipeline: LevelSetPipeline,
    sink: Option<Arc<dyn LevelSetSink>>,
}

impl MultiSetController {
    pub fn new(pipeline: LevelSetPipeline, sink: Option<Arc<dyn LevelSetSink>>) -> Self {
        Self { pipeline, sink }
    }

    /// Generate every set of `config`.
    ///
    /// Per-set progress is only reported for multi-set runs. A set that yields
    /// nothing is marked `Error` and later sets still run; partial sets cut
    /// short by cancellation are returned but never persisted.
    pub async fn run(
        &self,
        config: &RunConfig,
        tracker: &Arc<RunProgressTracker>,
        cancel: &CancellationToken,
    ) -> DomainResult<MultiSetRun> {
        let track_sets = config.multi_set.is_some();
        let requests = set_requests(config);
        let mut run = MultiSetRun::default();

        for (set_index, request) in requests.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(set = set_index + 1, "cancellation observed, not starting further sets");
                run.cancelled = true;
                break;
            }

            if track_sets {
                tracker.set_started(set_index, &request.name).await;
                info!(set = %request.name, index = set_index, "starting set");
            }

            let set_run = self.pipeline.run(request, tracker, cancel).await?;
            run.failed_tasks += set_run.failed;
            let status = if set_run.cancelled {
                RunStatus::Cancelled
            } else if set_run.success == 0 {
                RunStatus::Error
            } else {
                RunStatus::Completed
            };
            if track_sets {
                tracker
                    .set_finished(set_index, status, set_run.success, set_run.failed)
                    .await;
            }

            let mut level_set = set_run.level_set;
            match status {
                RunStatus::Completed => {
                    self.persist(&mut level_set, set_index, track_sets, tracker).await;
                    run.sets.push(level_set);
                }
                RunStatus::Cancelled => {
                    run.sets.push(level_set);
                    run.cancelled = true;
                    break;
                }
                _ => {
                    warn!(set = %request.name, failed = set_run.failed, "set produced no levels");
                    run.empty_sets += 1;
                }
            }
        }

        Ok(run)
    }

    /// Persist through the sink if one is configured. Failures are logged, not raised.
    async fn persist(
        &self,
        level_set: &mut LevelSet,
        set_index: usize,
        track_sets: bool,
        tracker: &RunProgressTracker,
    ) {
        let Some(sink) = &self.sink else {
            return;
        };

        let persisted = match sink.persist(level_set).await {
            Ok(storage_id) => {
                info!(set = %level_set.name, storage_id = %storage_id, "level set persisted");
                level_set.storage_id = Some(storage_id);
                true
            }
            Err(err) => {
                warn!(set = %level_set.name, error = %err, "failed to persist level set");
                false
            }
        };
        if track_sets {
            tracker.set_persisted(set_index, persisted).await;
        }
    }
}

/// Fail a finished run that produced no levels at all.
pub fn ensure_levels(run: &MultiSetRun) -> DomainResult<()> {
    if !run.cancelled && run.sets.iter().all(LevelSet::is_empty) {
        return Err(DomainError::NoSuccessfulLevels {
            failed: run.failed_tasks,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{DifficultyCurve, DifficultyPoint, MultiSetConfig};

    fn config() -> RunConfig {
        RunConfig::new(
            "Forest",
            4,
            DifficultyCurve::from_points(vec![
                DifficultyPoint::new(1, 0.2).unwrap(),
                DifficultyPoint::new(4, 0.8).unwrap(),
            ]),
        )
    }

    #[test]
    fn test_single_run_keeps_name() {
        let requests = set_requests(&config());
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].name, "Forest");
        assert_eq!(requests[0].total_count, 4);
    }

    #[test]
    fn test_sets_shift_and_offset() {
        let cfg = config().with_multi_set(MultiSetConfig {
            set_count: 3,
            difficulty_shift_per_set: 0.1,
            max_difficulty_clamp: 0.85,
        });
        let requests = set_requests(&cfg);
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2].name, "Forest #3");
        assert_eq!(requests[2].global_offset, 8);
        assert!(requests.iter().all(|r| r.total_count == 12));

        let first = requests[1].curve.points();
        assert!((first[0].difficulty - 0.3).abs() < 1e-9);
        let last = requests[2].curve.points();
        assert!((last[1].difficulty - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_ensure_levels_rejects_empty_completed_run() {
        let run = MultiSetRun {
            empty_sets: 2,
            failed_tasks: 8,
            ..MultiSetRun::default()
        };
        assert!(matches!(
            ensure_levels(&run),
            Err(DomainError::NoSuccessfulLevels { failed: 8 })
        ));

        let cancelled = MultiSetRun {
            cancelled: true,
            ..MultiSetRun::default()
        };
        assert!(ensure_levels(&cancelled).is_ok());
    }
}
