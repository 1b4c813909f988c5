//! Version-control collaborator seams.
//!
//! The graph builder only needs to read the source repository and the
//! executor only needs to mutate the destination, so each side gets its own
//! trait. [`git::GitCli`] implements both against the `git` binary;
//! [`crate::fakes`] holds in-memory doubles for tests.

pub mod git;

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::VcsError;

pub use git::GitCli;

/// Result alias for collaborator calls.
pub type VcsResult<T> = std::result::Result<T, VcsError>;

/// Presence and cleanliness of a destination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DestinationStatus {
    /// The directory exists.
    pub exists: bool,
    /// The directory holds a repository.
    pub is_repository: bool,
    /// No uncommitted changes. Meaningless unless `is_repository`.
    pub clean: bool,
}

impl DestinationStatus {
    pub fn missing() -> Self {
        Self {
            exists: false,
            is_repository: false,
            clean: false,
        }
    }
}

/// Read side: the repository whose history is replayed.
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Log lines `hash (parent parent...): subject`, oldest first, covering
    /// every local branch with no duplicates.
    async fn commit_log(&self) -> VcsResult<Vec<String>>;

    /// `(branch name, tip hash)` for every local branch.
    async fn branch_tips(&self) -> VcsResult<Vec<(String, String)>>;

    /// `(hash, tag name)` for every tagged commit.
    async fn tags(&self) -> VcsResult<Vec<(String, String)>>;

    /// Single-commit patch of `hash` in mailbox format.
    async fn format_patch(&self, hash: &str) -> VcsResult<String>;
}

/// Write side: the repository history is replayed onto.
///
/// Every call acts on the currently checked-out branch unless it names one.
#[async_trait]
pub trait DestinationRepository: Send + Sync {
    /// Verify that the patch at `patch` applies cleanly.
    async fn check_patch(&self, patch: &Path) -> VcsResult<()>;

    /// Apply the patch at `patch` as a commit, keeping author and message.
    async fn apply_patch(&self, patch: &Path) -> VcsResult<()>;

    async fn checkout(&self, branch: &str) -> VcsResult<()>;

    /// Create `branch` at the current position and check it out.
    async fn create_branch(&self, branch: &str) -> VcsResult<()>;

    /// Merge `branch` into the checked-out branch without fast-forward.
    async fn merge_no_ff(&self, branch: &str, message: &str) -> VcsResult<()>;

    async fn delete_branch(&self, branch: &str) -> VcsResult<()>;

    /// Tag the current position.
    async fn tag_head(&self, name: &str) -> VcsResult<()>;

    /// Create the directory if needed and initialise an empty repository.
    async fn init(&self) -> VcsResult<()>;

    async fn inspect(&self) -> VcsResult<DestinationStatus>;
}
