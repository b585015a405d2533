//! Common test utilities for integration tests
//!
//! Curve builders, a gated generation service for deterministic
//! cancellation tests, and tracing setup.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

use levelforge::adapters::generation::ScriptedGenerationService;
use levelforge::domain::models::{DifficultyCurve, DifficultyPoint, DispatcherConfig, RunConfig};
use levelforge::domain::ports::{
    GenerationError, GenerationRequest, GenerationResponse, GenerationService,
};

/// Setup test logging
///
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Two-point curve from `start` at level 1 to `end` at level `levels`.
pub fn linear_curve(levels: usize, start: f64, end: f64) -> DifficultyCurve {
    let last = u32::try_from(levels).expect("level count fits u32");
    DifficultyCurve::from_points([
        DifficultyPoint::new(1, start).expect("valid start point"),
        DifficultyPoint::new(last, end).expect("valid end point"),
    ])
}

pub fn linear_run(name: &str, levels: usize) -> RunConfig {
    RunConfig::new(name, levels, linear_curve(levels, 0.1, 0.9))
}

/// Dispatcher settings with a fixed seed and no real backoff delays.
pub fn fast_config(concurrency: usize) -> DispatcherConfig {
    DispatcherConfig {
        concurrency,
        backoff_base_ms: 1,
        backoff_max_ms: 2,
        seed: Some(42),
        ..DispatcherConfig::default()
    }
}

/// Holds every call until the gate is opened.
pub struct GatedService {
    inner: ScriptedGenerationService,
    gate: watch::Receiver<bool>,
}

impl GatedService {
    pub fn new(inner: ScriptedGenerationService) -> (Arc<Self>, watch::Sender<bool>) {
        let (open, gate) = watch::channel(false);
        (Arc::new(Self { inner, gate }), open)
    }

    pub fn call_count(&self) -> u32 {
        self.inner.call_count()
    }
}

#[async_trait]
impl GenerationService for GatedService {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let mut gate = self.gate.clone();
        gate.wait_for(|open| *open)
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        self.inner.generate(request).await
    }
}
