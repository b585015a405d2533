pub mod config;
pub mod curve;
pub mod grade;
pub mod level_set;
pub mod plan;
pub mod progress;
pub mod run;
pub mod task;

pub use config::{
    Config, DatabaseConfig, DispatcherConfig, GimmickUnlock, LoggingConfig, ServiceConfig,
};
pub use curve::{DifficultyCurve, DifficultyPoint, DEFAULT_DIFFICULTY};
pub use grade::Grade;
pub use level_set::{Level, LevelSet, ReorderReport};
pub use plan::{GenerationPlan, GenerationPlanItem, GradeHistogram};
pub use progress::{RunProgress, RunStatus, SetProgress};
pub use run::{MultiSetConfig, RunConfig};
pub use task::{ArtifactResult, GenerationTask, TaskStatus};
