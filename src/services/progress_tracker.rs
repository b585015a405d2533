//! Run progress tracking.
//!
//! The tracker is the only state shared between concurrently running tasks.
//! All writes go through an async `RwLock`; every change publishes a fresh
//! [`RunProgress`] snapshot on a `watch` channel for subscribers.

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info};

use crate::domain::errors::DomainResult;
use crate::domain::models::{RunProgress, RunStatus, SetProgress};

/// Number of recent task durations averaged for the ETA.
const ROLLING_WINDOW: usize = 20;

#[derive(Debug, Default)]
struct TrackerState {
    progress: RunProgress,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
    recent_durations: VecDeque<Duration>,
}

impl TrackerState {
    fn refresh_timing(&mut self) {
        let now = self.finished_at.unwrap_or_else(Instant::now);
        if let Some(start) = self.started_at {
            self.progress.elapsed = now.saturating_duration_since(start);
        }

        if !self.recent_durations.is_empty() {
            let total: Duration = self.recent_durations.iter().sum();
            let count = u32::try_from(self.recent_durations.len()).unwrap_or(u32::MAX);
            self.progress.average_task_duration = total / count;
        }

        self.progress.estimated_remaining = if self.progress.status == RunStatus::Generating
            && !self.recent_durations.is_empty()
        {
            let remaining = u32::try_from(self.progress.pending + self.progress.generating)
                .unwrap_or(u32::MAX);
            Some(self.progress.average_task_duration * remaining)
        } else {
            None
        };
    }

    fn set_mut(&mut self, set_index: usize) -> Option<&mut SetProgress> {
        self.progress
            .sets
            .iter_mut()
            .find(|s| s.set_index == set_index)
    }
}

/// Serialized owner of a run's [`RunProgress`].
#[derive(Debug)]
pub struct RunProgressTracker {
    state: RwLock<TrackerState>,
    sender: watch::Sender<RunProgress>,
}

impl Default for RunProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RunProgressTracker {
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(RunProgress::default());
        Self {
            state: RwLock::new(TrackerState::default()),
            sender,
        }
    }

    /// Receive every published snapshot from now on.
    pub fn subscribe(&self) -> watch::Receiver<RunProgress> {
        self.sender.subscribe()
    }

    /// Current snapshot with elapsed time refreshed.
    pub async fn snapshot(&self) -> RunProgress {
        let mut state = self.state.write().await;
        state.refresh_timing();
        state.progress.clone()
    }

    pub async fn status(&self) -> RunStatus {
        self.state.read().await.progress.status
    }

    fn publish(&self, state: &mut TrackerState) {
        state.refresh_timing();
        self.sender.send_replace(state.progress.clone());
    }

    /// `Idle -> Generating` with `total` pending tasks.
    pub async fn start(&self, total: usize) -> DomainResult<()> {
        let mut state = self.state.write().await;
        state.progress.status = state.progress.status.transition(RunStatus::Generating)?;
        state.progress.total = total;
        state.progress.pending = total;
        state.started_at = Some(Instant::now());
        info!(total, "run started");
        self.publish(&mut state);
        Ok(())
    }

    /// A task was picked up by a worker.
    pub async fn task_started(&self) {
        let mut state = self.state.write().await;
        state.progress.pending = state.progress.pending.saturating_sub(1);
        state.progress.generating += 1;
        self.publish(&mut state);
    }

    /// A task finished (successfully or not) after `duration`.
    pub async fn task_finished(&self, success: bool, duration: Duration) {
        let mut state = self.state.write().await;
        state.progress.generating = state.progress.generating.saturating_sub(1);
        if success {
            state.progress.success += 1;
        } else {
            state.progress.failed += 1;
        }
        if state.recent_durations.len() == ROLLING_WINDOW {
            state.recent_durations.pop_front();
        }
        state.recent_durations.push_back(duration);
        debug!(
            success = state.progress.success,
            failed = state.progress.failed,
            pending = state.progress.pending,
            "task finished"
        );
        self.publish(&mut state);
    }

    /// Register a set of a multi-set run and mark it current.
    pub async fn set_started(&self, set_index: usize, name: &str) {
        let mut state = self.state.write().await;
        state.progress.current_set = Some(set_index);
        let entry = SetProgress {
            set_index,
            name: name.to_string(),
            status: RunStatus::Generating,
            success: 0,
            failed: 0,
            persisted: false,
        };
        match state.set_mut(set_index) {
            Some(existing) => *existing = entry,
            None => state.progress.sets.push(entry),
        }
        self.publish(&mut state);
    }

    pub async fn set_finished(&self, set_index: usize, status: RunStatus, success: usize, failed: usize) {
        let mut state = self.state.write().await;
        if let Some(set) = state.set_mut(set_index) {
            set.status = status;
            set.success = success;
            set.failed = failed;
        }
        self.publish(&mut state);
    }

    pub async fn set_persisted(&self, set_index: usize, persisted: bool) {
        let mut state = self.state.write().await;
        if let Some(set) = state.set_mut(set_index) {
            set.persisted = persisted;
        }
        self.publish(&mut state);
    }

    async fn finish(&self, status: RunStatus, error: Option<String>) -> DomainResult<()> {
        let mut state = self.state.write().await;
        state.progress.status = state.progress.status.transition(status)?;
        state.progress.error = error;
        state.progress.current_set = None;
        state.finished_at = Some(Instant::now());
        info!(
            status = %status,
            success = state.progress.success,
            failed = state.progress.failed,
            "run finished"
        );
        self.publish(&mut state);
        Ok(())
    }

    /// `Generating -> Completed`.
    pub async fn complete(&self) -> DomainResult<()> {
        self.finish(RunStatus::Completed, None).await
    }

    /// `Generating -> Cancelled`.
    pub async fn cancel(&self) -> DomainResult<()> {
        self.finish(RunStatus::Cancelled, None).await
    }

    /// `Generating -> Error`, or `Idle -> Generating -> Error` for runs that
    /// failed before starting.
    pub async fn fail(&self, message: impl Into<String>) -> DomainResult<()> {
        if self.status().await == RunStatus::Idle {
            self.start(0).await?;
        }
        self.finish(RunStatus::Error, Some(message.into())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_follow_task_lifecycle() {
        let tracker = RunProgressTracker::new();
        tracker.start(3).await.unwrap();
        tracker.task_started().await;
        tracker.task_started().await;

        let snap = tracker.snapshot().await;
        assert_eq!((snap.pending, snap.generating), (1, 2));

        tracker.task_finished(true, Duration::from_millis(10)).await;
        tracker.task_finished(false, Duration::from_millis(30)).await;
        let snap = tracker.snapshot().await;
        assert_eq!((snap.success, snap.failed, snap.generating), (1, 1, 0));
        assert_eq!(snap.average_task_duration, Duration::from_millis(20));
        assert_eq!(snap.estimated_remaining, Some(Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_terminal_state_is_final() {
        let tracker = RunProgressTracker::new();
        assert!(tracker.complete().await.is_err());
        tracker.start(1).await.unwrap();
        tracker.cancel().await.unwrap();
        assert_eq!(tracker.status().await, RunStatus::Cancelled);
        assert!(tracker.complete().await.is_err());
        assert!(tracker.start(1).await.is_err());
    }

    #[tokio::test]
    async fn test_fail_from_idle_records_message() {
        let tracker = RunProgressTracker::new();
        tracker.fail("bad curve").await.unwrap();
        let snap = tracker.snapshot().await;
        assert_eq!(snap.status, RunStatus::Error);
        assert_eq!(snap.error.as_deref(), Some("bad curve"));
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let tracker = RunProgressTracker::new();
        let mut rx = tracker.subscribe();
        tracker.start(2).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().status, RunStatus::Generating);
        assert_eq!(rx.borrow().total, 2);
    }

    #[tokio::test]
    async fn test_set_tracking() {
        let tracker = RunProgressTracker::new();
        tracker.start(4).await.unwrap();
        tracker.set_started(0, "Pack #1").await;
        tracker.set_finished(0, RunStatus::Completed, 2, 0).await;
        tracker.set_persisted(0, true).await;
        tracker.set_started(1, "Pack #2").await;

        let snap = tracker.snapshot().await;
        assert_eq!(snap.current_set, Some(1));
        assert_eq!(snap.sets.len(), 2);
        assert!(snap.sets[0].persisted);
        assert_eq!(snap.sets[1].status, RunStatus::Generating);
    }
}
