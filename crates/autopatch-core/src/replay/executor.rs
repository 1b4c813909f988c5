//! Sequential execution of replay tasks against the destination.
//!
//! Tasks run strictly in order, one in flight at a time. The first failure
//! stops the run; tasks already applied stay applied.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{AutopatchError, Result, VcsError};
use crate::obs;
use crate::replay::task::ReplayTask;
use crate::vcs::{DestinationRepository, SourceRepository, VcsResult};

/// Outcome of a fully successful execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    pub tasks_run: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionSummary {
    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

/// Runs [`ReplayTask`]s, reading patches from `source` and writing to `dest`.
pub struct TaskExecutor<'a> {
    source: &'a dyn SourceRepository,
    dest: &'a dyn DestinationRepository,
    patch_file: PathBuf,
}

impl<'a> TaskExecutor<'a> {
    /// `patch_file` is the transient file each patch is staged in.
    pub fn new(
        source: &'a dyn SourceRepository,
        dest: &'a dyn DestinationRepository,
        patch_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            dest,
            patch_file: patch_file.into(),
        }
    }

    pub fn patch_file(&self) -> &Path {
        &self.patch_file
    }

    /// Run every task in order, stopping at the first failure.
    pub async fn execute(&self, tasks: &[ReplayTask]) -> Result<ExecutionSummary> {
        let started_at = Utc::now();

        for (index, task) in tasks.iter().enumerate() {
            debug!(index, task = %task, "running task");
            if let Err(source) = self.run_task(task).await {
                obs::emit_task_failed(index, task.kind(), &source);
                return Err(AutopatchError::TaskFailed {
                    index,
                    task: task.to_string(),
                    source,
                });
            }
            obs::emit_task_applied(index, task.kind(), task);
        }

        Ok(ExecutionSummary {
            tasks_run: tasks.len(),
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn run_task(&self, task: &ReplayTask) -> VcsResult<()> {
        match task {
            ReplayTask::Checkout { branch } => self.checkout_or_create(branch).await,
            ReplayTask::Patch { hash, message } => {
                self.apply_commit(hash).await?;
                info!(hash = %hash, message = %message, "patched commit");
                Ok(())
            }
            ReplayTask::Merge {
                target,
                source,
                message,
            } => {
                self.dest.checkout(target).await?;
                self.dest.merge_no_ff(source, message).await?;
                info!(source = %source, target = %target, "merged branch");
                Ok(())
            }
            ReplayTask::DeleteBranch { branch } => {
                self.dest.delete_branch(branch).await?;
                info!(branch = %branch, "deleted branch");
                Ok(())
            }
            ReplayTask::Tag { name } => {
                self.dest.tag_head(name).await?;
                info!(tag = %name, "created tag");
                Ok(())
            }
        }
    }

    async fn checkout_or_create(&self, branch: &str) -> VcsResult<()> {
        match self.dest.checkout(branch).await {
            Ok(()) => {
                info!(branch = %branch, "switched to existing branch");
                Ok(())
            }
            Err(err) => {
                debug!(branch = %branch, error = %err, "checkout failed, creating branch");
                self.dest.create_branch(branch).await?;
                info!(branch = %branch, "created branch");
                Ok(())
            }
        }
    }

    /// Stage the commit's patch, apply it, and remove the staged file
    /// whatever the outcome.
    async fn apply_commit(&self, hash: &str) -> VcsResult<()> {
        let patch = self.source.format_patch(hash).await?;
        tokio::fs::write(&self.patch_file, patch)
            .await
            .map_err(|source| VcsError::PatchFile {
                path: self.patch_file.clone(),
                source,
            })?;

        let outcome = match self.dest.check_patch(&self.patch_file).await {
            Ok(()) => self.dest.apply_patch(&self.patch_file).await,
            Err(err) => Err(err),
        };

        if let Err(err) = tokio::fs::remove_file(&self.patch_file).await {
            warn!(path = %self.patch_file.display(), error = %err, "could not remove patch file");
        }
        outcome
    }
}
