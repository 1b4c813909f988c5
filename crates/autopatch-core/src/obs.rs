//! Structured observability hooks for the replay lifecycle.
//!
//! This module provides:
//! - Replay-scoped tracing spans via `ReplaySpan`
//! - Emission functions for key lifecycle events: history gathered, branch
//!   split, plan built, task applied or failed, replay finished
//!
//! Events are emitted at `info!` level (configurable via `AUTOPATCH_LOG`).

use std::future::Future;

use tracing::instrument::Instrumented;
use tracing::{info, Instrument};
use uuid::Uuid;

/// Replay-scoped tracing span.
///
/// The span is attached to the replay future rather than entered, so it
/// follows the future across await points.
///
/// # Example
///
/// ```ignore
/// let span = ReplaySpan::new(Uuid::new_v4());
/// span.instrument(async { /* every event carries replay_id */ }).await;
/// ```
#[derive(Debug, Clone)]
pub struct ReplaySpan {
    replay_id: Uuid,
    span: tracing::Span,
}

impl ReplaySpan {
    /// Create a span tagged with the replay id.
    pub fn new(replay_id: Uuid) -> Self {
        let span = tracing::info_span!("autopatch.replay", replay_id = %replay_id);
        Self { replay_id, span }
    }

    pub fn replay_id(&self) -> Uuid {
        self.replay_id
    }

    /// Run `future` inside the span.
    pub fn instrument<F: Future>(&self, future: F) -> Instrumented<F> {
        future.instrument(self.span.clone())
    }
}

/// Emit event: source history read and reconstructed.
pub fn emit_history_gathered(commits: usize, branches: usize, tags: usize) {
    info!(
        event = "history.gathered",
        commits = commits,
        branches = branches,
        tags = tags,
    );
}

/// Emit event: an inferred branch was split in two.
pub fn emit_branch_split(original: usize, tail: usize, cut: usize, moved_merges: usize) {
    info!(
        event = "branch.split",
        original = original,
        tail = tail,
        cut = cut,
        moved_merges = moved_merges,
    );
}

/// Emit event: replay plan computed for a commit range.
pub fn emit_plan_built(start: usize, end: usize, tasks: usize) {
    info!(event = "plan.built", start = start, end = end, tasks = tasks);
}

/// Emit event: one task applied to the destination.
pub fn emit_task_applied(index: usize, kind: &str, detail: &dyn std::fmt::Display) {
    info!(event = "task.applied", index = index, kind = %kind, detail = %detail);
}

/// Emit event: a task failed and the replay stops (warning level).
pub fn emit_task_failed(index: usize, kind: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "task.failed", index = index, kind = %kind, error = %error);
}

/// Emit event: replay finished.
pub fn emit_replay_finished(tasks_run: usize, duration_ms: u64, success: bool) {
    info!(
        event = "replay.finished",
        tasks_run = tasks_run,
        duration_ms = duration_ms,
        success = success,
    );
}

#[cfg(test)]
mod tests {
    use super::{emit_plan_built, ReplaySpan};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_replay_span_wraps_future() {
        let id = Uuid::new_v4();
        let span = ReplaySpan::new(id);
        assert_eq!(span.replay_id(), id);
        let value = span
            .instrument(async {
                emit_plan_built(0, 3, 5);
                7
            })
            .await;
        assert_eq!(value, 7);
    }
}
