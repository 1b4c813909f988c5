//! In-memory fakes for the collaborator traits (testing only).
//!
//! Provides `MemorySource` and `RecordingDestination`, which satisfy the
//! trait contracts without a `git` binary.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::VcsError;
use crate::vcs::{DestinationRepository, DestinationStatus, SourceRepository, VcsResult};

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

/// Source repository serving canned log lines, tips, tags and patches.
///
/// A hash without a registered patch yields `patch <hash>`.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    log: Vec<String>,
    tips: Vec<(String, String)>,
    tags: Vec<(String, String)>,
    patches: HashMap<String, String>,
}

impl MemorySource {
    pub fn new<S: AsRef<str>>(log: &[S]) -> Self {
        Self {
            log: log.iter().map(|l| l.as_ref().to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_tip(mut self, branch: &str, hash: &str) -> Self {
        self.tips.push((branch.to_string(), hash.to_string()));
        self
    }

    pub fn with_tag(mut self, hash: &str, tag: &str) -> Self {
        self.tags.push((hash.to_string(), tag.to_string()));
        self
    }

    pub fn with_patch(mut self, hash: &str, patch: &str) -> Self {
        self.patches.insert(hash.to_string(), patch.to_string());
        self
    }
}

#[async_trait]
impl SourceRepository for MemorySource {
    async fn commit_log(&self) -> VcsResult<Vec<String>> {
        Ok(self.log.clone())
    }

    async fn branch_tips(&self) -> VcsResult<Vec<(String, String)>> {
        Ok(self.tips.clone())
    }

    async fn tags(&self) -> VcsResult<Vec<(String, String)>> {
        Ok(self.tags.clone())
    }

    async fn format_patch(&self, hash: &str) -> VcsResult<String> {
        Ok(self
            .patches
            .get(hash)
            .cloned()
            .unwrap_or_else(|| format!("patch {hash}")))
    }
}

// ---------------------------------------------------------------------------
// RecordingDestination
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct DestinationState {
    calls: Vec<String>,
    applied: Vec<String>,
    branches: BTreeSet<String>,
    current: Option<String>,
    tags: Vec<String>,
    status: DestinationStatus,
    fail_on_call: Option<usize>,
}

/// Destination repository that records every call.
///
/// Tracks known branches so a checkout of an unknown branch fails like the
/// real one does. Can be told to fail on the n-th call (1-based).
#[derive(Debug)]
pub struct RecordingDestination {
    state: Mutex<DestinationState>,
}

impl Default for RecordingDestination {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDestination {
    /// An existing, clean repository with only `main`, checked out.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DestinationState {
                calls: Vec::new(),
                applied: Vec::new(),
                branches: BTreeSet::from(["main".to_string()]),
                current: Some("main".to_string()),
                tags: Vec::new(),
                status: DestinationStatus {
                    exists: true,
                    is_repository: true,
                    clean: true,
                },
                fail_on_call: None,
            }),
        }
    }

    /// A destination whose directory does not exist yet.
    pub fn missing() -> Self {
        let dest = Self::new();
        {
            let mut state = dest.state.lock().unwrap();
            state.status = DestinationStatus::missing();
            state.branches.clear();
            state.current = None;
        }
        dest
    }

    pub fn with_status(self, status: DestinationStatus) -> Self {
        self.state.lock().unwrap().status = status;
        self
    }

    pub fn fail_on_call(self, n: usize) -> Self {
        self.state.lock().unwrap().fail_on_call = Some(n);
        self
    }

    /// Every call so far, rendered as `op arg...`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    /// Contents of every patch applied, in order.
    pub fn applied_patches(&self) -> Vec<String> {
        self.state.lock().unwrap().applied.clone()
    }

    pub fn branches(&self) -> Vec<String> {
        self.state.lock().unwrap().branches.iter().cloned().collect()
    }

    pub fn current_branch(&self) -> Option<String> {
        self.state.lock().unwrap().current.clone()
    }

    pub fn tags(&self) -> Vec<String> {
        self.state.lock().unwrap().tags.clone()
    }

    /// Record `call` and return the mutable state, or the injected failure.
    fn record(&self, call: String) -> VcsResult<std::sync::MutexGuard<'_, DestinationState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call.clone());
        if state.fail_on_call == Some(state.calls.len()) {
            return Err(VcsError::Rejected(format!("injected failure on {call}")));
        }
        Ok(state)
    }
}

#[async_trait]
impl DestinationRepository for RecordingDestination {
    async fn check_patch(&self, patch: &Path) -> VcsResult<()> {
        drop(self.record(format!("check_patch {}", patch.display()))?);
        if !patch.exists() {
            return Err(VcsError::Rejected(format!("no patch at {}", patch.display())));
        }
        Ok(())
    }

    async fn apply_patch(&self, patch: &Path) -> VcsResult<()> {
        let content = tokio::fs::read_to_string(patch)
            .await
            .map_err(|source| VcsError::PatchFile {
                path: patch.to_path_buf(),
                source,
            })?;
        let mut state = self.record(format!("apply_patch {}", patch.display()))?;
        if let Some(current) = state.current.clone() {
            state.branches.insert(current);
        }
        state.applied.push(content);
        Ok(())
    }

    async fn checkout(&self, branch: &str) -> VcsResult<()> {
        let mut state = self.record(format!("checkout {branch}"))?;
        if !state.branches.contains(branch) {
            return Err(VcsError::Rejected(format!("unknown branch {branch}")));
        }
        state.current = Some(branch.to_string());
        Ok(())
    }

    async fn create_branch(&self, branch: &str) -> VcsResult<()> {
        let mut state = self.record(format!("create_branch {branch}"))?;
        if !state.branches.insert(branch.to_string()) {
            return Err(VcsError::Rejected(format!("branch {branch} exists")));
        }
        state.current = Some(branch.to_string());
        Ok(())
    }

    async fn merge_no_ff(&self, branch: &str, message: &str) -> VcsResult<()> {
        let state = self.record(format!("merge {branch} -m {message}"))?;
        if !state.branches.contains(branch) {
            return Err(VcsError::Rejected(format!("unknown branch {branch}")));
        }
        Ok(())
    }

    async fn delete_branch(&self, branch: &str) -> VcsResult<()> {
        let mut state = self.record(format!("delete_branch {branch}"))?;
        if state.current.as_deref() == Some(branch) {
            return Err(VcsError::Rejected(format!("{branch} is checked out")));
        }
        if !state.branches.remove(branch) {
            return Err(VcsError::Rejected(format!("unknown branch {branch}")));
        }
        Ok(())
    }

    async fn tag_head(&self, name: &str) -> VcsResult<()> {
        let mut state = self.record(format!("tag {name}"))?;
        state.tags.push(name.to_string());
        Ok(())
    }

    async fn init(&self) -> VcsResult<()> {
        let mut state = self.record("init".to_string())?;
        state.status = DestinationStatus {
            exists: true,
            is_repository: true,
            clean: true,
        };
        state.current = Some("main".to_string());
        Ok(())
    }

    async fn inspect(&self) -> VcsResult<DestinationStatus> {
        let state = self.record("inspect".to_string())?;
        Ok(state.status)
    }
}
