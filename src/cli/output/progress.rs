//! Progress bar rendering for running generations.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;
use tokio_stream::{Stream, StreamExt};

use crate::domain::models::RunProgress;

const PROGRESS_TEMPLATE: &str =
    "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}";
const PROGRESS_CHARS: &str = "█▓▒░ ";

/// Progress bar drawn on stderr.
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_TEMPLATE) {
        pb.set_style(style.progress_chars(PROGRESS_CHARS));
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Status line shown next to the bar.
pub fn progress_message(progress: &RunProgress) -> String {
    let mut parts = vec![format!("{} ok", progress.success)];
    if progress.failed > 0 {
        parts.push(format!("{} failed", progress.failed));
    }
    if let Some(set) = progress.current_set.and_then(|i| progress.sets.iter().find(|s| s.set_index == i)) {
        parts.push(set.name.clone());
    }
    if let Some(eta) = progress.estimated_remaining {
        parts.push(format!("~{}s left", eta.as_secs()));
    }
    parts.join(" · ")
}

/// Mirror progress snapshots onto `bar` until the run reaches a terminal state.
pub async fn render_run_progress<S>(mut updates: S, bar: ProgressBar)
where
    S: Stream<Item = RunProgress> + Unpin,
{
    while let Some(progress) = updates.next().await {
        bar.set_length(progress.total as u64);
        bar.set_position(progress.completed() as u64);
        bar.set_message(progress_message(&progress));
        if progress.status.is_terminal() {
            break;
        }
    }
    bar.finish_and_clear();
}
