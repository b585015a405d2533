//! Adaptive generation dispatcher.
//!
//! Runs generation tasks in fixed-size batches. Within a batch every task
//! runs concurrently on its own tokio task; a batch finishes completely
//! before the next one starts. Cancellation is observed only between
//! batches, so in-flight service calls are never abandoned.
//!
//! Each task owns two nested retry loops: service failures are retried by
//! [`ServiceRetryPolicy`], and grade mismatches are corrected by
//! [`GradeCorrection`]. Every correction attempt draws on the same
//! service-failure budget and keeps the gimmick reductions earned so far.

use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::gimmick_resolver::GimmickStrategy;
use super::grade_correction::{adjusted_target, Acceptance, CorrectionState, Decision, GradeCorrection};
use super::progress_tracker::RunProgressTracker;
use super::retry_policy::ServiceRetryPolicy;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ArtifactResult, DispatcherConfig, GenerationTask, TaskStatus};
use crate::domain::ports::{GenerationRequest, GenerationService};

/// Run-wide inputs shared by every task of a dispatch.
#[derive(Debug, Clone, Default)]
pub struct DispatchContext {
    /// Tasks across the whole run, for the gimmick intensity ramp.
    pub total_count: usize,
    /// Opaque shape parameters forwarded to the service.
    pub shape_params: serde_json::Value,
}

/// Results of one dispatch.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    /// One result per executed task, ordered by task index.
    pub results: Vec<ArtifactResult>,
    /// Cancellation stopped the dispatch before every batch ran.
    pub cancelled: bool,
    pub batches_run: usize,
    pub batches_total: usize,
}

impl DispatchOutcome {
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.success_count()
    }
}

/// Drives the generation service for a list of tasks.
#[derive(Clone)]
pub struct GenerationDispatcher {
    service: Arc<dyn GenerationService>,
    gimmicks: Arc<dyn GimmickStrategy>,
    retry: ServiceRetryPolicy,
    correction: GradeCorrection,
    concurrency: usize,
    seed: Option<u64>,
}

impl GenerationDispatcher {
    pub fn new(
        service: Arc<dyn GenerationService>,
        gimmicks: Arc<dyn GimmickStrategy>,
        config: &DispatcherConfig,
    ) -> Self {
        Self {
            service,
            gimmicks,
            retry: ServiceRetryPolicy::from_config(config),
            correction: GradeCorrection::new(config.max_grade_retries, config.adjacent_grade_after),
            concurrency: config.concurrency.max(1),
            seed: config.seed,
        }
    }

    /// Make parameter jitter reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Request for the task's first attempt: planned target plus resolved gimmicks.
    pub fn build_request(&self, task: &GenerationTask, context: &DispatchContext) -> GenerationRequest {
        let total = context.total_count.max(task.global_index + 1);
        GenerationRequest {
            target_difficulty: adjusted_target(task.plan.target_difficulty, task.difficulty_adjustment),
            gimmick_intensity: Some(
                (self.gimmicks.intensity(task.global_index, total) * task.gimmick_intensity_adjustment)
                    .clamp(0.0, 1.0),
            ),
            available_gimmicks: Some(self.gimmicks.available(task.level_number())),
            unlock_level_number: Some(task.level_number()),
            shape_params: context.shape_params.clone(),
        }
    }

    /// Execute `tasks` batch by batch, reporting into `tracker`.
    ///
    /// Returns an error only for orchestration faults (a worker panicked);
    /// individual task failures are recorded on their results.
    pub async fn dispatch(
        &self,
        tasks: Vec<GenerationTask>,
        context: &DispatchContext,
        tracker: &Arc<RunProgressTracker>,
        cancel: &CancellationToken,
    ) -> DomainResult<DispatchOutcome> {
        let batches: Vec<Vec<GenerationTask>> = tasks
            .chunks(self.concurrency)
            .map(<[GenerationTask]>::to_vec)
            .collect();
        let context = Arc::new(context.clone());
        let mut outcome = DispatchOutcome {
            batches_total: batches.len(),
            ..DispatchOutcome::default()
        };

        for (batch_idx, batch) in batches.into_iter().enumerate() {
            if cancel.is_cancelled() {
                info!(
                    batch = batch_idx + 1,
                    remaining = outcome.batches_total - batch_idx,
                    "cancellation observed, not starting further batches"
                );
                outcome.cancelled = true;
                break;
            }

            info!(batch = batch_idx + 1, tasks = batch.len(), "starting batch");
            let batch_results = self.run_batch(batch, &context, tracker).await?;
            let succeeded = batch_results.iter().filter(|r| r.is_success()).count();
            info!(
                batch = batch_idx + 1,
                succeeded,
                failed = batch_results.len() - succeeded,
                "batch completed"
            );
            outcome.results.extend(batch_results);
            outcome.batches_run += 1;
        }

        outcome.results.sort_by_key(|r| r.task_index);
        Ok(outcome)
    }

    /// Run one batch concurrently, bounded by the semaphore.
    async fn run_batch(
        &self,
        batch: Vec<GenerationTask>,
        context: &Arc<DispatchContext>,
        tracker: &Arc<RunProgressTracker>,
    ) -> DomainResult<Vec<ArtifactResult>> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(batch.len());

        for task in batch {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| DomainError::ExecutionFailed("Semaphore closed".to_string()))?;

            let dispatcher = self.clone();
            let context = Arc::clone(context);
            let tracker = Arc::clone(tracker);
            let span = info_span!("task", index = task.task_index, grade = %task.plan.grade);

            let handle = tokio::spawn(
                async move {
                    let _permit = permit;
                    let started = Instant::now();
                    tracker.task_started().await;
                    let result = dispatcher.run_task(task, &context).await;
                    tracker
                        .task_finished(result.is_success(), started.elapsed())
                        .await;
                    result
                }
                .instrument(span),
            );
            handles.push(handle);
        }

        join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.map_err(DomainError::from))
            .collect()
    }

    /// Drive one task through its service and grade-correction loops.
    pub async fn run_task(&self, mut task: GenerationTask, context: &DispatchContext) -> ArtifactResult {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ task.global_index as u64),
            None => StdRng::from_entropy(),
        };
        let mut retries = self.retry.task_state(task.plan.target_difficulty);
        let mut state = CorrectionState::default();

        loop {
            let mut request = self.build_request(&task, context);
            retries.apply(&mut request);

            let call = self
                .retry
                .execute(&request, &mut retries, &mut rng, |req| {
                    let service = Arc::clone(&self.service);
                    async move { service.generate(req).await }
                })
                .await;
            task.gimmick_intensity_adjustment = retries.intensity_factor();
            let service_retries = retries.spent();

            let response = match call.result {
                Ok(response) => response,
                Err(err) => {
                    warn!(
                        task = task.task_index,
                        service = self.service.name(),
                        error = %err,
                        "task failed: service retries exhausted"
                    );
                    return ArtifactResult::failed(&task, service_retries, err.to_string());
                }
            };

            match self.correction.observe(state, task.plan.grade, response.grade) {
                Decision::Accept(acceptance) => {
                    if acceptance == Acceptance::Compromise {
                        warn!(
                            task = task.task_index,
                            planned = %task.plan.grade,
                            actual = %response.grade,
                            "grade retries exhausted, keeping last result"
                        );
                    }
                    debug!(
                        task = task.task_index,
                        planned = %task.plan.grade,
                        actual = %response.grade,
                        retries = state.retry_count,
                        ?acceptance,
                        "task accepted"
                    );
                    return ArtifactResult {
                        task_index: task.task_index,
                        artifact: Some(response.artifact),
                        actual_difficulty: response.actual_difficulty,
                        grade: Some(response.grade),
                        planned_grade: task.plan.grade,
                        planned_difficulty: task.plan.target_difficulty,
                        status: TaskStatus::Success,
                        grade_retries: state.retry_count,
                        service_retries,
                        compromise: acceptance == Acceptance::Compromise,
                        error: None,
                    };
                }
                Decision::Retry(next) => {
                    debug!(
                        task = task.task_index,
                        planned = %task.plan.grade,
                        actual = %response.grade,
                        retry = next.retry_count,
                        adjustment = next.adjustment,
                        "grade mismatch, adjusting target"
                    );
                    state = next;
                    task.retry_count = next.retry_count;
                    task.difficulty_adjustment = next.adjustment;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::generation::ScriptedGenerationService;
    use crate::domain::models::{GenerationPlanItem, GimmickUnlock, Grade};
    use crate::services::gimmick_resolver::LinearGimmickStrategy;

    fn task(task_index: usize, grade: Grade) -> GenerationTask {
        GenerationTask::new(
            task_index,
            task_index,
            GenerationPlanItem {
                grade,
                target_difficulty: grade.midpoint(),
                count: 1,
            },
        )
    }

    fn dispatcher(service: Arc<ScriptedGenerationService>) -> GenerationDispatcher {
        let config = DispatcherConfig {
            backoff_base_ms: 1,
            backoff_max_ms: 2,
            ..DispatcherConfig::default()
        };
        let gimmicks = LinearGimmickStrategy::new(vec![
            GimmickUnlock::new("ice", 1),
            GimmickUnlock::new("bomb", 3),
        ]);
        GenerationDispatcher::new(service, Arc::new(gimmicks), &config).with_seed(42)
    }

    #[test]
    fn test_build_request_resolves_gimmicks() {
        let d = dispatcher(Arc::new(ScriptedGenerationService::new()));
        let context = DispatchContext {
            total_count: 5,
            shape_params: serde_json::json!({"width": 9}),
        };
        let first = d.build_request(&task(0, Grade::S), &context);
        assert_eq!(first.available_gimmicks.as_deref(), Some(&["ice".to_string()][..]));
        assert_eq!(first.gimmick_intensity, Some(0.0));
        assert_eq!(first.unlock_level_number, Some(1));
        assert_eq!(first.shape_params["width"], 9);

        let last = d.build_request(&task(4, Grade::D), &context);
        assert_eq!(last.available_gimmicks.unwrap().len(), 2);
        assert_eq!(last.gimmick_intensity, Some(1.0));
        assert!((last.target_difficulty - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_exact_service_needs_no_retries() {
        let service = Arc::new(ScriptedGenerationService::new());
        let d = dispatcher(Arc::clone(&service));
        let result = d.run_task(task(0, Grade::C), &DispatchContext::default()).await;
        assert!(result.is_success());
        assert_eq!(result.grade, Some(Grade::C));
        assert_eq!(result.grade_retries, 0);
        assert_eq!(service.call_count(), 1);
    }

    #[tokio::test]
    async fn test_one_harder_accepts_adjacent_within_twenty() {
        let service = Arc::new(ScriptedGenerationService::new().with_grade_offset(1));
        let d = dispatcher(Arc::clone(&service));
        // Easiest band: lowering the target can never reach S, so only the
        // adjacent rule ends the loop.
        let result = d.run_task(task(0, Grade::S), &DispatchContext::default()).await;
        assert!(result.is_success());
        assert_eq!(result.grade, Some(Grade::A));
        assert_eq!(result.grade_retries, 20);
        assert!(!result.compromise);
        assert_eq!(service.call_count(), 21);
    }

    #[tokio::test]
    async fn test_two_harder_ends_as_compromise() {
        let service = Arc::new(ScriptedGenerationService::new().with_grade_offset(2));
        let d = dispatcher(Arc::clone(&service));
        let result = d.run_task(task(0, Grade::S), &DispatchContext::default()).await;
        assert!(result.is_success());
        assert!(result.compromise);
        assert_eq!(result.grade_retries, 30);
        assert_eq!(service.call_count(), 31);
    }

    #[tokio::test]
    async fn test_service_failures_exhaust_into_failed_result() {
        let service = Arc::new(ScriptedGenerationService::new().failing_first(1000));
        let d = dispatcher(Arc::clone(&service));
        let result = d.run_task(task(3, Grade::B), &DispatchContext::default()).await;
        assert_eq!(result.status, TaskStatus::Failed);
        assert_eq!(result.task_index, 3);
        assert_eq!(result.service_retries, 10);
        assert_eq!(service.call_count(), 11);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_service_budget_spans_grade_corrections() {
        // Five failures in every six calls, and every success one grade harder.
        let service = Arc::new(
            ScriptedGenerationService::new()
                .with_grade_offset(1)
                .failing_cycle(5, 6),
        );
        let d = dispatcher(Arc::clone(&service));
        let result = d.run_task(task(0, Grade::S), &DispatchContext::default()).await;

        assert_eq!(result.status, TaskStatus::Failed);
        assert_eq!(result.service_retries, 10);
        assert_eq!(result.grade_retries, 2);
        // Two successful calls, ten retried failures, one final failure.
        assert_eq!(service.call_count(), 13);
    }

    #[tokio::test]
    async fn test_correction_attempt_keeps_reduced_intensity() {
        let service = Arc::new(
            ScriptedGenerationService::new()
                .with_grade_offset(1)
                .failing_cycle(5, 6),
        );
        let d = dispatcher(Arc::clone(&service));
        let context = DispatchContext {
            total_count: 5,
            shape_params: serde_json::Value::Null,
        };
        d.run_task(task(4, Grade::S), &context).await;

        let requests = service.requests().await;
        let intensity = |i: usize| requests[i].gimmick_intensity.unwrap();
        assert!((intensity(0) - 1.0).abs() < 1e-9);
        assert!((intensity(5) - 0.64).abs() < 1e-9);
        // First request of the next correction attempt starts where the last call ended.
        assert!((intensity(6) - 0.64).abs() < 1e-9);
        assert!(intensity(10) < intensity(6));
    }

    #[tokio::test]
    async fn test_dispatch_batches_respect_concurrency() {
        let service = Arc::new(
            ScriptedGenerationService::new().with_latency(std::time::Duration::from_millis(5)),
        );
        let config = DispatcherConfig {
            concurrency: 3,
            ..DispatcherConfig::default()
        };
        let d = GenerationDispatcher::new(
            Arc::clone(&service) as Arc<dyn GenerationService>,
            Arc::new(LinearGimmickStrategy::default()),
            &config,
        );
        let tasks: Vec<GenerationTask> = (0..8).map(|i| task(i, Grade::B)).collect();
        let tracker = Arc::new(RunProgressTracker::new());
        tracker.start(8).await.unwrap();

        let outcome = d
            .dispatch(tasks, &DispatchContext::default(), &tracker, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.batches_total, 3);
        assert_eq!(outcome.batches_run, 3);
        assert_eq!(outcome.success_count(), 8);
        assert!(service.max_in_flight() <= 3);
        let indexes: Vec<usize> = outcome.results.iter().map(|r| r.task_index).collect();
        assert_eq!(indexes, (0..8).collect::<Vec<_>>());
        assert_eq!(tracker.snapshot().await.success, 8);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_runs_nothing() {
        let service = Arc::new(ScriptedGenerationService::new());
        let d = dispatcher(Arc::clone(&service));
        let tracker = Arc::new(RunProgressTracker::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = d
            .dispatch(vec![task(0, Grade::S)], &DispatchContext::default(), &tracker, &cancel)
            .await
            .unwrap();
        assert!(outcome.cancelled);
        assert!(outcome.results.is_empty());
        assert_eq!(service.call_count(), 0);
    }
}
