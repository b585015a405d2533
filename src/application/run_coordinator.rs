use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{DispatcherConfig, GimmickUnlock, LevelSet, RunConfig, RunProgress};
use crate::domain::ports::{GenerationService, LevelSetSink};
use crate::services::gimmick_resolver::{GimmickStrategy, LinearGimmickStrategy};
use crate::services::multi_set::{ensure_levels, MultiSetController};
use crate::services::{GenerationDispatcher, LevelSetPipeline, RunProgressTracker};

/// What a finished run hands back.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Run without multi-set configuration.
    Single(LevelSet),
    /// Multi-set run, sets in generation order.
    Multi(Vec<LevelSet>),
}

impl RunOutcome {
    pub fn sets(&self) -> &[LevelSet] {
        match self {
            Self::Single(set) => std::slice::from_ref(set),
            Self::Multi(sets) => sets,
        }
    }

    pub fn into_sets(self) -> Vec<LevelSet> {
        match self {
            Self::Single(set) => vec![set],
            Self::Multi(sets) => sets,
        }
    }

    /// Levels placed across all sets.
    pub fn level_count(&self) -> usize {
        self.sets().iter().map(LevelSet::len).sum()
    }
}

/// Handle to a run executing in the background.
pub struct RunHandle {
    tracker: Arc<RunProgressTracker>,
    cancel: CancellationToken,
    task: JoinHandle<DomainResult<RunOutcome>>,
}

impl RunHandle {
    /// Request cancellation. Running batches finish; no new batch or set starts.
    pub fn cancel(&self) {
        info!("run cancellation requested");
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that cancels this run, for signal handlers and other tasks.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stream of progress snapshots, starting with the current one.
    pub fn subscribe_progress(&self) -> impl Stream<Item = RunProgress> + Send + Unpin {
        WatchStream::new(self.tracker.subscribe())
    }

    pub async fn progress(&self) -> RunProgress {
        self.tracker.snapshot().await
    }

    /// Wait for the run to finish.
    ///
    /// A run task that panicked is reported as an orchestration failure and
    /// its progress is moved to `Error`.
    pub async fn join(self) -> DomainResult<RunOutcome> {
        match self.task.await {
            Ok(result) => result,
            Err(join_err) => {
                let err = DomainError::from(join_err);
                error!(error = %err, "run task aborted");
                if !self.tracker.status().await.is_terminal() {
                    if let Err(transition) = self.tracker.fail(err.to_string()).await {
                        warn!(error = %transition, "could not record run failure");
                    }
                }
                Err(err)
            }
        }
    }
}

/// Entry point for callers: configures collaborators and starts runs.
#[derive(Clone)]
pub struct RunCoordinator {
    service: Arc<dyn GenerationService>,
    gimmicks: Arc<dyn GimmickStrategy>,
    sink: Option<Arc<dyn LevelSetSink>>,
    config: DispatcherConfig,
}

impl RunCoordinator {
    pub fn new(service: Arc<dyn GenerationService>, config: DispatcherConfig) -> Self {
        Self {
            service,
            gimmicks: Arc::new(LinearGimmickStrategy::new(GimmickUnlock::default_table())),
            sink: None,
            config,
        }
    }

    #[must_use]
    pub fn with_gimmicks(mut self, gimmicks: Arc<dyn GimmickStrategy>) -> Self {
        self.gimmicks = gimmicks;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LevelSetSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    fn controller(&self) -> MultiSetController {
        let dispatcher =
            GenerationDispatcher::new(Arc::clone(&self.service), Arc::clone(&self.gimmicks), &self.config);
        MultiSetController::new(LevelSetPipeline::new(dispatcher), self.sink.clone())
    }

    /// Start `run` in the background.
    ///
    /// Must be called from within a tokio runtime. Validation errors surface
    /// from [`RunHandle::join`] with progress in `Error`.
    pub fn start_run(&self, run: RunConfig) -> RunHandle {
        let tracker = Arc::new(RunProgressTracker::new());
        let cancel = CancellationToken::new();
        let controller = self.controller();
        let span = info_span!("run", name = %run.name);

        let task = tokio::spawn(
            execute(controller, run, Arc::clone(&tracker), cancel.clone()).instrument(span),
        );

        RunHandle {
            tracker,
            cancel,
            task,
        }
    }
}

async fn execute(
    controller: MultiSetController,
    run: RunConfig,
    tracker: Arc<RunProgressTracker>,
    cancel: CancellationToken,
) -> DomainResult<RunOutcome> {
    if let Err(err) = run.validate() {
        error!(error = %err, "run rejected");
        tracker.fail(err.to_string()).await?;
        return Err(err);
    }

    info!(levels = run.level_count, sets = run.set_count(), "run accepted");
    tracker.start(run.set_count() * run.level_count).await?;

    let result = match controller.run(&run, &tracker, &cancel).await {
        Ok(result) => result,
        Err(err) => {
            error!(error = %err, "run failed");
            tracker.fail(err.to_string()).await?;
            return Err(err);
        }
    };

    if result.cancelled {
        tracker.cancel().await?;
        if result.sets.is_empty() {
            return Err(DomainError::Cancelled);
        }
    } else if let Err(err) = ensure_levels(&result) {
        error!(error = %err, "run produced no levels");
        tracker.fail(err.to_string()).await?;
        return Err(err);
    } else {
        tracker.complete().await?;
    }

    let sets = result.sets;
    if run.multi_set.is_some() {
        return Ok(RunOutcome::Multi(sets));
    }
    sets.into_iter()
        .next()
        .map(RunOutcome::Single)
        .ok_or_else(|| DomainError::ExecutionFailed("run finished without a level set".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::generation::ScriptedGenerationService;
    use crate::domain::models::{DifficultyCurve, DifficultyPoint, MultiSetConfig, RunStatus};
    use tokio_stream::StreamExt;

    fn coordinator(service: ScriptedGenerationService) -> RunCoordinator {
        RunCoordinator::new(Arc::new(service), DispatcherConfig::default()).with_seed(7)
    }

    fn linear_run(levels: usize) -> RunConfig {
        RunConfig::new(
            "Meadow",
            levels,
            DifficultyCurve::from_points(vec![
                DifficultyPoint::new(1, 0.1).unwrap(),
                DifficultyPoint::new(u32::try_from(levels).unwrap(), 0.9).unwrap(),
            ]),
        )
    }

    #[tokio::test]
    async fn test_single_run_completes() {
        let handle = coordinator(ScriptedGenerationService::new()).start_run(linear_run(6));
        let outcome = handle.join().await.unwrap();
        match outcome {
            RunOutcome::Single(set) => {
                assert_eq!(set.name, "Meadow");
                assert_eq!(set.len(), 6);
            }
            RunOutcome::Multi(_) => panic!("expected a single set"),
        }
    }

    #[tokio::test]
    async fn test_invalid_run_ends_in_error() {
        let mut run = linear_run(3);
        run.level_count = 0;
        let handle = coordinator(ScriptedGenerationService::new()).start_run(run);
        let mut progress = handle.subscribe_progress();
        let result = handle.join().await;
        assert!(matches!(result, Err(DomainError::ValidationFailed(_))));

        let mut last = None;
        while let Some(snapshot) = progress.next().await {
            last = Some(snapshot);
        }
        assert_eq!(last.unwrap().status, RunStatus::Error);
    }

    #[tokio::test]
    async fn test_all_failures_report_no_successful_levels() {
        let service = ScriptedGenerationService::new().failing_first(u32::MAX);
        let config = DispatcherConfig {
            api_error_retries: 1,
            backoff_base_ms: 1,
            backoff_max_ms: 1,
            ..DispatcherConfig::default()
        };
        let handle = RunCoordinator::new(Arc::new(service), config).start_run(linear_run(3));
        let tracker = Arc::clone(&handle.tracker);
        let result = handle.join().await;
        assert!(matches!(result, Err(DomainError::NoSuccessfulLevels { failed: 3 })));
        assert_eq!(tracker.status().await, RunStatus::Error);
    }

    struct PanickingSink;

    #[async_trait::async_trait]
    impl LevelSetSink for PanickingSink {
        async fn persist(&self, _set: &LevelSet) -> DomainResult<String> {
            panic!("sink exploded");
        }

        async fn list(&self) -> DomainResult<Vec<crate::domain::ports::LevelSetSummary>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_panicking_run_ends_in_error() {
        let handle = coordinator(ScriptedGenerationService::new())
            .with_sink(Arc::new(PanickingSink))
            .start_run(linear_run(3));
        let mut progress = handle.subscribe_progress();
        let tracker = Arc::clone(&handle.tracker);

        let result = handle.join().await;
        assert!(matches!(result, Err(DomainError::ExecutionFailed(_))));
        assert_eq!(tracker.status().await, RunStatus::Error);
        drop(tracker);

        let mut last = None;
        while let Some(snapshot) = progress.next().await {
            last = Some(snapshot);
        }
        let last = last.unwrap();
        assert_eq!(last.status, RunStatus::Error);
        assert!(last.error.is_some());
    }

    #[tokio::test]
    async fn test_multi_set_outcome_lists_sets() {
        let run = linear_run(4).with_multi_set(MultiSetConfig {
            set_count: 2,
            difficulty_shift_per_set: 0.05,
            max_difficulty_clamp: 1.0,
        });
        let outcome = coordinator(ScriptedGenerationService::new())
            .start_run(run)
            .join()
            .await
            .unwrap();
        let names: Vec<&str> = outcome.sets().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Meadow #1", "Meadow #2"]);
        assert_eq!(outcome.level_count(), 8);
    }
}
