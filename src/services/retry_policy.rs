//! Retry policy for failing generation-service calls.
//!
//! A failed call is retried with exponential backoff (`base * 1.5^attempt`).
//! Retries are not identical: each one perturbs the request so a parameter
//! region that keeps failing can be escaped. The budget belongs to the task,
//! so attempts are numbered across all of its calls.
//!
//! | attempt | target jitter (of planned target) | gimmicks                 |
//! |---------|-----------------------------------|--------------------------|
//! | 1-3     | ±5%                               | unchanged                |
//! | 4-6     | ±25%                              | ×0.8 each, pool shrinks  |
//! | 7+      | ±50%                              | ×0.8 each, pool shrinks  |

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use rand::seq::SliceRandom;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::grade_correction::{MAX_TARGET, MIN_TARGET};
use crate::domain::models::DispatcherConfig;
use crate::domain::ports::{GenerationError, GenerationRequest, GenerationResponse};

/// Backoff growth factor between attempts.
pub const BACKOFF_MULTIPLIER: f64 = 1.5;

/// Gimmick pools are never shrunk below this many entries.
pub const MIN_GIMMICK_POOL: usize = 3;

/// First attempt at which gimmicks are reduced.
const GIMMICK_REDUCTION_FROM: u32 = 4;

const INTENSITY_DECAY: f64 = 0.8;

/// Result of one service call including its retries.
#[derive(Debug)]
pub struct ServiceCallOutcome {
    pub result: Result<GenerationResponse, GenerationError>,
    /// Retries performed by this call after its first attempt.
    pub retries: u32,
}

/// Service-failure retry state owned by one task.
///
/// The retry budget, the backoff schedule, the gimmick intensity reduction
/// and the shrunk gimmick pool carry across every call the task makes,
/// including grade-correction re-invocations.
#[derive(Debug)]
pub struct TaskRetryState {
    planned_target: f64,
    spent: u32,
    pool: Option<Vec<String>>,
    backoff: ExponentialBackoff,
}

impl TaskRetryState {
    /// Retries spent so far across every call of the task.
    pub const fn spent(&self) -> u32 {
        self.spent
    }

    /// Gimmick intensity multiplier earned by the retries spent so far.
    pub fn intensity_factor(&self) -> f64 {
        ServiceRetryPolicy::intensity_factor(self.spent)
    }

    /// Carry an earlier pool reduction into a freshly built request.
    pub fn apply(&self, request: &mut GenerationRequest) {
        if let Some(pool) = &self.pool {
            request.available_gimmicks = Some(pool.clone());
        }
    }
}

/// Retry policy with exponential backoff and request perturbation.
#[derive(Debug, Clone)]
pub struct ServiceRetryPolicy {
    /// Maximum number of retries per task, across all of its calls
    max_retries: u32,
    /// Delay before the first retry
    base_backoff: Duration,
    /// Cap for any single delay
    max_backoff: Duration,
}

impl Default for ServiceRetryPolicy {
    fn default() -> Self {
        Self::new(10, 500, 30_000)
    }
}

impl ServiceRetryPolicy {
    pub fn new(max_retries: u32, base_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            base_backoff: Duration::from_millis(base_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms.max(base_backoff_ms)),
        }
    }

    pub fn from_config(config: &DispatcherConfig) -> Self {
        Self::new(
            config.api_error_retries,
            config.backoff_base_ms,
            config.backoff_max_ms,
        )
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Backoff schedule for one task.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.base_backoff)
            .with_multiplier(BACKOFF_MULTIPLIER)
            .with_randomization_factor(0.0)
            .with_max_interval(self.max_backoff)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Fresh retry state for a task planned at `planned_target`.
    pub fn task_state(&self, planned_target: f64) -> TaskRetryState {
        TaskRetryState {
            planned_target,
            spent: 0,
            pool: None,
            backoff: self.backoff(),
        }
    }

    /// Jitter on a 1-based retry attempt, as a fraction of the planned target.
    pub const fn jitter_window(attempt: u32) -> f64 {
        match attempt {
            0 => 0.0,
            1..=3 => 0.05,
            4..=6 => 0.25,
            _ => 0.50,
        }
    }

    /// Cumulative gimmick intensity factor after `attempt` retries.
    pub fn intensity_factor(attempt: u32) -> f64 {
        if attempt < GIMMICK_REDUCTION_FROM {
            return 1.0;
        }
        let reductions = attempt - GIMMICK_REDUCTION_FROM + 1;
        INTENSITY_DECAY.powi(i32::try_from(reductions).unwrap_or(i32::MAX))
    }

    /// Build the request for task-level retry `attempt`.
    ///
    /// The target is jittered around `base`'s target by a window sized
    /// against the planned target. Gimmick reductions build on `previous`,
    /// and the pool kept in `state` shrinks by one random member per attempt
    /// from the reduction threshold on.
    pub fn perturb<R: Rng>(
        base: &GenerationRequest,
        previous: &GenerationRequest,
        attempt: u32,
        state: &mut TaskRetryState,
        rng: &mut R,
    ) -> GenerationRequest {
        let mut request = base.clone();
        request.gimmick_intensity = previous.gimmick_intensity;

        let window = Self::jitter_window(attempt);
        if window > 0.0 {
            let jitter = rng.gen_range(-window..=window) * state.planned_target;
            request.target_difficulty = (base.target_difficulty + jitter).clamp(MIN_TARGET, MAX_TARGET);
        }

        if attempt >= GIMMICK_REDUCTION_FROM {
            request.gimmick_intensity = previous
                .gimmick_intensity
                .map(|i| (i * INTENSITY_DECAY).clamp(0.0, 1.0));

            if state.pool.is_none() {
                state.pool = base.available_gimmicks.clone();
            }
            if let Some(gimmicks) = state.pool.as_mut() {
                if gimmicks.len() > MIN_GIMMICK_POOL {
                    gimmicks.shuffle(rng);
                    gimmicks.pop();
                }
            }
        }
        if state.pool.is_some() {
            request.available_gimmicks = state.pool.clone();
        }
        request
    }

    /// Execute `operation`, retrying service failures with backoff and perturbation.
    ///
    /// Retries draw on the task's budget in `state`; once `max_retries` have
    /// been spent by this or any earlier call of the task, the next failure
    /// is handed back.
    pub async fn execute<F, Fut, R>(
        &self,
        base: &GenerationRequest,
        state: &mut TaskRetryState,
        rng: &mut R,
        mut operation: F,
    ) -> ServiceCallOutcome
    where
        F: FnMut(GenerationRequest) -> Fut,
        Fut: Future<Output = Result<GenerationResponse, GenerationError>>,
        R: Rng + Send,
    {
        let mut request = base.clone();
        let mut retries = 0;

        loop {
            match operation(request.clone()).await {
                Ok(response) => {
                    if retries > 0 {
                        debug!(retries, spent = state.spent, "generation succeeded after retries");
                    }
                    return ServiceCallOutcome {
                        result: Ok(response),
                        retries,
                    };
                }
                Err(err) => {
                    if state.spent >= self.max_retries {
                        warn!(spent = state.spent, error = %err, "generation failed after all retries");
                        return ServiceCallOutcome {
                            result: Err(err),
                            retries,
                        };
                    }

                    let delay = state.backoff.next_backoff().unwrap_or(self.max_backoff);
                    warn!(
                        attempt = state.spent + 1,
                        max_retries = self.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "generation call failed, retrying"
                    );
                    sleep(delay).await;

                    state.spent += 1;
                    retries += 1;
                    request = Self::perturb(base, &request, state.spent, state, rng);
                }
            }
        }
    }
}
