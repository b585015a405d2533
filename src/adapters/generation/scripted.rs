//! Deterministic in-process generation service.
//!
//! Used by tests and by the CLI's offline mode. The measured difficulty of
//! an artifact is the requested target shifted by whole grade bands, so the
//! grade-correction loop can be exercised without a real generator.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::domain::models::Grade;
use crate::domain::ports::{GenerationError, GenerationRequest, GenerationResponse, GenerationService};

/// Width of one grade band.
const GRADE_BAND: f64 = 0.2;

/// Scripted generation service.
#[derive(Debug, Default)]
pub struct ScriptedGenerationService {
    grade_offset: i32,
    fail_first: u32,
    fail_cycle: Option<(u32, u32)>,
    latency: Option<Duration>,
    calls: AtomicU32,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl ScriptedGenerationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return artifacts `offset` grade bands harder (positive) or easier than requested.
    #[must_use]
    pub fn with_grade_offset(mut self, offset: i32) -> Self {
        self.grade_offset = offset;
        self
    }

    /// Fail the first `n` calls with a 503.
    #[must_use]
    pub fn failing_first(mut self, n: u32) -> Self {
        self.fail_first = n;
        self
    }

    /// Fail the first `failures` calls of every `period` consecutive calls.
    #[must_use]
    pub fn failing_cycle(mut self, failures: u32, period: u32) -> Self {
        self.fail_cycle = (period > 0).then_some((failures, period));
        self
    }

    /// Sleep for `latency` inside every call.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Every request received, in arrival order.
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }

    /// Measured difficulty for a requested target.
    pub fn measure(&self, target: f64) -> f64 {
        (f64::from(self.grade_offset).mul_add(GRADE_BAND, target)).clamp(0.0, 1.0)
    }
}

#[async_trait]
impl GenerationService for ScriptedGenerationService {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        self.requests.lock().await.push(request.clone());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let cycle_failure = self
            .fail_cycle
            .is_some_and(|(failures, period)| call % period < failures);
        if call < self.fail_first || cycle_failure {
            return Err(GenerationError::Server {
                status: 503,
                message: format!("scripted failure {}", call + 1),
            });
        }

        let actual = self.measure(request.target_difficulty);
        Ok(GenerationResponse {
            artifact: serde_json::json!({
                "seed": call,
                "requested": request.target_difficulty,
                "gimmicks": request.available_gimmicks.unwrap_or_default(),
                "shape": request.shape_params,
            }),
            actual_difficulty: actual,
            grade: Grade::classify(actual),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_offset_shifts_grade() {
        let service = ScriptedGenerationService::new().with_grade_offset(1);
        let response = service.generate(GenerationRequest::new(0.1)).await.unwrap();
        assert_eq!(response.grade, Grade::A);
        assert!((response.actual_difficulty - 0.3).abs() < 1e-9);

        let top = service.generate(GenerationRequest::new(0.9)).await.unwrap();
        assert_eq!(top.grade, Grade::D);
    }

    #[tokio::test]
    async fn test_fails_first_calls_then_recovers() {
        let service = ScriptedGenerationService::new().failing_first(2);
        assert_err!(service.generate(GenerationRequest::new(0.5)).await);
        assert_err!(service.generate(GenerationRequest::new(0.5)).await);
        assert_ok!(service.generate(GenerationRequest::new(0.5)).await);
        assert_eq!(service.call_count(), 3);
        assert_eq!(service.requests().await.len(), 3);
    }

    #[tokio::test]
    async fn test_failing_cycle_repeats() {
        let service = ScriptedGenerationService::new().failing_cycle(2, 3);
        for _ in 0..2 {
            assert_err!(service.generate(GenerationRequest::new(0.5)).await);
            assert_err!(service.generate(GenerationRequest::new(0.5)).await);
            assert_ok!(service.generate(GenerationRequest::new(0.5)).await);
        }
    }
}
