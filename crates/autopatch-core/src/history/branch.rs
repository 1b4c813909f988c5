//! Branches and merge records inferred from the log.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use crate::history::commit::Commit;

/// Stable handle of a branch inside a [`crate::history::CommitGraph`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BranchId(pub usize);

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// "This branch, up to here, was merged into `target` by merge commit
/// `commit` with `comment`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Merge {
    pub target: BranchId,
    pub commit: String,
    pub comment: String,
}

/// An ordered run of commits plus the merges made out of it.
///
/// Merge records are keyed by the local index of the branch's last commit
/// at the time of the merge.
#[derive(Debug, Clone, Default)]
pub struct Branch {
    pub(crate) name: Option<String>,
    pub(crate) source: Option<BranchId>,
    pub(crate) commits: Vec<Commit>,
    pub(crate) merges: BTreeMap<usize, Vec<Merge>>,
    pub(crate) closed: bool,
}

impl Branch {
    pub(crate) fn new(source: Option<BranchId>, commits: Vec<Commit>) -> Self {
        Self {
            source,
            commits,
            ..Self::default()
        }
    }

    /// Name resolved from a merge message or a live branch tip, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name used when replaying: the resolved name, or a stable placeholder
    /// derived from the first commit number.
    pub fn replay_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("unnamed-{}", self.first_number().unwrap_or(0)),
        }
    }

    /// Branch this one forked from.
    pub fn source(&self) -> Option<BranchId> {
        self.source
    }

    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Hash of the commit this branch grew out of: the first parent of its
    /// first commit.
    pub fn fork_point(&self) -> Option<&str> {
        self.commits
            .first()?
            .parent_hashes
            .first()
            .map(String::as_str)
    }

    pub fn last_commit(&self) -> Option<&Commit> {
        self.commits.last()
    }

    pub fn first_number(&self) -> Option<usize> {
        self.commits.first().map(|c| c.number)
    }

    pub fn last_number(&self) -> Option<usize> {
        self.commits.last().map(|c| c.number)
    }

    /// Local index of the commit with `hash`.
    pub fn position_of_hash(&self, hash: &str) -> Option<usize> {
        self.commits.iter().position(|c| c.hash == hash)
    }

    /// Local index of the commit with `number`.
    pub fn position_of_number(&self, number: usize) -> Option<usize> {
        self.commits.binary_search_by_key(&number, |c| c.number).ok()
    }

    pub fn merges(&self) -> &BTreeMap<usize, Vec<Merge>> {
        &self.merges
    }

    /// Merge records made at local index `index`, empty when there are none.
    pub fn merges_at(&self, index: usize) -> &[Merge] {
        self.merges.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether any merge record sits at a local index strictly after `index`.
    pub fn has_merges_after(&self, index: usize) -> bool {
        self.merges.range(index + 1..).next().is_some()
    }

    /// Append a commit; a closed branch that gains a commit is open again.
    pub(crate) fn push(&mut self, commit: Commit) {
        self.commits.push(commit);
        self.closed = false;
    }

    /// Record that `merge` took this branch into `target` at the current
    /// last commit, and close the branch.
    pub(crate) fn mark_merged(&mut self, target: BranchId, merge: &Commit) {
        let index = self.commits.len().saturating_sub(1);
        self.merges.entry(index).or_default().push(Merge {
            target,
            commit: merge.hash.clone(),
            comment: merge.message.clone(),
        });
        self.closed = true;
    }

    /// Cut everything after local index `index` into a new branch forked from
    /// `this`. Merge records at or beyond the cut move along with their
    /// commits, re-keyed to the new local indices.
    ///
    /// The tail keeps the closed state; the remaining head counts as closed
    /// only if it was merged away at its new last commit.
    pub(crate) fn split_off_after(&mut self, this: BranchId, index: usize) -> Branch {
        let tail = self.commits.split_off(index + 1);
        let kept = self.commits.len();
        let moved = self.merges.split_off(&kept);

        let tail = Branch {
            name: None,
            source: Some(this),
            commits: tail,
            merges: moved.into_iter().map(|(i, m)| (i - kept, m)).collect(),
            closed: self.closed,
        };
        self.closed = kept > 0 && self.merges.contains_key(&(kept - 1));
        tail
    }

    /// After commits moved from `from` to `to`, point merge records and the
    /// fork source at `to` wherever the merge commit or the fork point is now
    /// owned by `to`.
    pub(crate) fn retarget(
        &mut self,
        from: BranchId,
        to: BranchId,
        owners: &HashMap<String, BranchId>,
    ) -> usize {
        let moved = |hash: &str| owners.get(hash) == Some(&to);
        let mut rewritten = 0;
        for record in self.merges.values_mut().flatten() {
            if record.target == from && moved(&record.commit) {
                record.target = to;
                rewritten += 1;
            }
        }
        if self.source == Some(from) && self.fork_point().is_some_and(moved) {
            self.source = Some(to);
        }
        rewritten
    }

    /// Point every merge record and fork source at `to` instead of `from`.
    pub(crate) fn repoint(&mut self, from: BranchId, to: BranchId) -> usize {
        let mut rewritten = 0;
        for record in self.merges.values_mut().flatten() {
            if record.target == from {
                record.target = to;
                rewritten += 1;
            }
        }
        if self.source == Some(from) {
            self.source = Some(to);
        }
        rewritten
    }
}
