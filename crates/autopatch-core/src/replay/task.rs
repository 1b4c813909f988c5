//! Abstract operations replayed against the destination repository.

use std::fmt;

use serde::Serialize;

/// One step of a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplayTask {
    /// Check out `branch`, creating it from the current position if needed.
    Checkout { branch: String },
    /// Apply the single-commit patch of `hash` from the source repository.
    Patch { hash: String, message: String },
    /// Check out `target` and merge `source` into it without fast-forward.
    Merge {
        target: String,
        source: String,
        message: String,
    },
    /// Delete the local `branch`.
    DeleteBranch { branch: String },
    /// Create tag `name` at the current position.
    Tag { name: String },
}

impl ReplayTask {
    /// Short label of the task kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ReplayTask::Checkout { .. } => "checkout",
            ReplayTask::Patch { .. } => "patch",
            ReplayTask::Merge { .. } => "merge",
            ReplayTask::DeleteBranch { .. } => "delete_branch",
            ReplayTask::Tag { .. } => "tag",
        }
    }
}

impl fmt::Display for ReplayTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayTask::Checkout { branch } => write!(f, "checkout {branch}"),
            ReplayTask::Patch { hash, message } => write!(f, "patch {hash} ({message})"),
            ReplayTask::Merge { target, source, .. } => write!(f, "merge {source} into {target}"),
            ReplayTask::DeleteBranch { branch } => write!(f, "delete branch {branch}"),
            ReplayTask::Tag { name } => write!(f, "tag {name}"),
        }
    }
}
