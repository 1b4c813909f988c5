//! End-to-end orchestration of one autopatch run.
//!
//! `gather_history` → `resolve_range` → [`crate::replay::plan`] →
//! `replay`. Each stage aborts the run on its first error; nothing touches
//! the destination before `replay`.

use std::path::Path;

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Selection;
use crate::error::{AutopatchError, PlanError, Result};
use crate::history::{CommitGraph, CommitGraphBuilder, CommitRange};
use crate::obs::{self, ReplaySpan};
use crate::replay::{ExecutionSummary, ReplayTask, TaskExecutor};
use crate::vcs::{DestinationRepository, SourceRepository};

/// Read the source log, tips and tags and reconstruct the branch graph.
pub async fn gather_history(source: &dyn SourceRepository) -> Result<CommitGraph> {
    let log = source.commit_log().await?;
    let mut builder = CommitGraphBuilder::new();
    for line in &log {
        builder.push_line(line)?;
    }

    let tips = source.branch_tips().await?;
    builder.reconcile_tips(&tips)?;

    let tags = source.tags().await?;
    let tagged = builder.apply_tags(&tags);

    let graph = builder.finish();
    obs::emit_history_gathered(graph.commit_count(), graph.len(), tagged);
    Ok(graph)
}

/// Turn a selection into a commit number range of `graph`.
pub fn resolve_range(
    graph: &CommitGraph,
    selection: &Selection,
) -> std::result::Result<CommitRange, PlanError> {
    let resolve = |prefix: &str| {
        graph
            .commit_number_for_hash(prefix)
            .ok_or_else(|| PlanError::UnresolvedHash {
                prefix: prefix.to_string(),
            })
    };

    match selection {
        Selection::Branch(name) => graph
            .commit_numbers_for_branch(name)
            .ok_or_else(|| PlanError::UnknownBranch { name: name.clone() }),
        Selection::Commit { hash, count } => {
            let start = resolve(hash)?;
            let count = count.unwrap_or(1);
            let end = start
                .checked_add(count.saturating_sub(1))
                .ok_or(PlanError::CountOverflow { start, count })?;
            CommitRange::new(start, end)
        }
        Selection::HashRange { start, end } => CommitRange::new(resolve(start)?, resolve(end)?),
    }
}

/// Make sure the destination is a repository before replaying onto it.
///
/// A missing directory is only created when `can_create`, which callers set
/// for replays starting at the first commit.
pub async fn prepare_destination(
    dest: &dyn DestinationRepository,
    path: &Path,
    can_create: bool,
) -> Result<()> {
    let status = dest.inspect().await?;

    if !status.exists {
        if !can_create {
            return Err(AutopatchError::DestinationUnavailable {
                path: path.to_path_buf(),
            });
        }
        dest.init().await?;
        info!(path = %path.display(), "new repository created");
        return Ok(());
    }

    if !status.is_repository {
        dest.init().await?;
        info!(path = %path.display(), "new repository created");
        return Ok(());
    }

    if !status.clean {
        warn!(path = %path.display(), "destination has uncommitted changes");
    }
    Ok(())
}

/// Prepare the destination and execute `tasks`, planned from `range`.
pub async fn replay(
    source: &dyn SourceRepository,
    dest: &dyn DestinationRepository,
    dest_path: &Path,
    tasks: &[ReplayTask],
    range: CommitRange,
    patch_file: &Path,
) -> Result<ExecutionSummary> {
    let span = ReplaySpan::new(Uuid::new_v4());
    span.instrument(async move {
        prepare_destination(dest, dest_path, range.start == 0).await?;

        let executor = TaskExecutor::new(source, dest, patch_file);
        match executor.execute(tasks).await {
            Ok(summary) => {
                obs::emit_replay_finished(summary.tasks_run, summary.duration_ms(), true);
                Ok(summary)
            }
            Err(err) => {
                let tasks_run = match &err {
                    AutopatchError::TaskFailed { index, .. } => *index,
                    _ => 0,
                };
                obs::emit_replay_finished(tasks_run, 0, false);
                Err(err)
            }
        }
    })
    .await
}
