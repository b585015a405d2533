pub mod curve_matcher;
pub mod dispatcher;
pub mod gimmick_resolver;
pub mod grade_correction;
pub mod multi_set;
pub mod pipeline;
pub mod progress_tracker;
pub mod retry_policy;

pub use curve_matcher::{CurveMatcher, MatchOutcome};
pub use dispatcher::{DispatchContext, DispatchOutcome, GenerationDispatcher};
pub use gimmick_resolver::{GimmickStrategy, LinearGimmickStrategy};
pub use grade_correction::{Acceptance, CorrectionState, Decision, GradeCorrection};
pub use multi_set::{MultiSetController, MultiSetRun};
pub use pipeline::{LevelSetPipeline, SetRequest, SetRun};
pub use progress_tracker::RunProgressTracker;
pub use retry_policy::{ServiceRetryPolicy, TaskRetryState};
