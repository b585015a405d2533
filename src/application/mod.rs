pub mod run_coordinator;

pub use run_coordinator::{RunCoordinator, RunHandle, RunOutcome};
