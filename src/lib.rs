//! Levelforge - Difficulty-Curve Orchestration Engine
//!
//! Levelforge drives an external level generation service so that a finished
//! level set follows a designer-authored difficulty curve. A run samples the
//! curve, plans how many artifacts of each grade to request, dispatches those
//! requests concurrently with grade correction and retry, and finally
//! rank-matches the successful artifacts back onto the curve.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Curves, grades, plans, tasks, level sets and the ports
//! - **Service Layer** (`services`): Dispatcher, grade correction, retry, rank matching
//! - **Application Layer** (`application`): Background runs with progress and cancellation
//! - **Adapters** (`adapters`): HTTP and scripted generators, SQLite persistence
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use levelforge::adapters::generation::ScriptedGenerationService;
//! use levelforge::{DifficultyCurve, DifficultyPoint, DispatcherConfig, RunConfig, RunCoordinator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let curve = DifficultyCurve::from_points([
//!         DifficultyPoint::new(1, 0.1)?,
//!         DifficultyPoint::new(20, 0.9)?,
//!     ]);
//!     let coordinator = RunCoordinator::new(
//!         Arc::new(ScriptedGenerationService::new()),
//!         DispatcherConfig::default(),
//!     );
//!     let outcome = coordinator.start_run(RunConfig::new("Spring", 20, curve)).join().await?;
//!     println!("{} levels", outcome.level_count());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{RunCoordinator, RunHandle, RunOutcome};
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    ArtifactResult, Config, DifficultyCurve, DifficultyPoint, DispatcherConfig, GenerationPlan,
    GenerationTask, Grade, Level, LevelSet, MultiSetConfig, RunConfig, RunProgress, RunStatus,
    TaskStatus,
};
pub use domain::ports::{
    GenerationError, GenerationRequest, GenerationResponse, GenerationService, LevelSetSink,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{CurveMatcher, GenerationDispatcher, GradeCorrection, ServiceRetryPolicy};
