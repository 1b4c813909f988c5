//! Arena of branches reconstructed from the log.
//!
//! Branches are addressed by [`BranchId`], an index into the arena that
//! never changes once handed out. Splitting a branch only appends to the
//! arena, so every id held by a merge record or a fork source stays valid.
//! A branch absorbed into another stays in the arena, empty, but leaves the
//! branch order.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::PlanError;
use crate::history::branch::{Branch, BranchId};
use crate::history::commit::Commit;

/// Inclusive range of commit numbers selected for replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommitRange {
    pub start: usize,
    pub end: usize,
}

impl CommitRange {
    /// Build a range, rejecting `start > end`.
    pub fn new(start: usize, end: usize) -> Result<Self, PlanError> {
        if start > end {
            return Err(PlanError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single(number: usize) -> Self {
        Self {
            start: number,
            end: number,
        }
    }

    /// Number of commits in the range; never zero.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, number: usize) -> bool {
        (self.start..=self.end).contains(&number)
    }
}

/// Serializable debug view of one branch.
#[derive(Debug, Clone, Serialize)]
pub struct BranchSummary {
    pub name: String,
    pub source: Option<String>,
    pub commits: Vec<String>,
    pub merges: BTreeMap<usize, String>,
    pub closed: bool,
}

/// The full set of reconstructed branches.
///
/// Every commit of the log belongs to exactly one branch.
#[derive(Debug, Clone, Default)]
pub struct CommitGraph {
    branches: Vec<Branch>,
    owners: HashMap<String, BranchId>,
    order: Vec<BranchId>,
}

impl CommitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of branches.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of commits across all branches.
    pub fn commit_count(&self) -> usize {
        self.owners.len()
    }

    /// Branch behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not handed out by this graph.
    pub fn branch(&self, id: BranchId) -> &Branch {
        &self.branches[id.0]
    }

    /// Branches in their current order (ascending first commit number once
    /// the graph is finished).
    pub fn branches(&self) -> impl Iterator<Item = (BranchId, &Branch)> + '_ {
        self.order.iter().map(|&id| (id, &self.branches[id.0]))
    }

    /// Replay names of all branches, in order.
    pub fn branch_names(&self) -> Vec<String> {
        self.branches().map(|(_, b)| b.replay_name()).collect()
    }

    /// Branch owning the commit with exactly `hash`.
    pub fn owner_of(&self, hash: &str) -> Option<BranchId> {
        self.owners.get(hash).copied()
    }

    /// Commit with exactly `hash`.
    pub fn find_commit(&self, hash: &str) -> Option<&Commit> {
        let id = self.owner_of(hash)?;
        let branch = self.branch(id);
        branch
            .position_of_hash(hash)
            .map(|index| &branch.commits()[index])
    }

    /// Owning branch and local index of commit `number`.
    pub fn locate(&self, number: usize) -> Option<(BranchId, usize)> {
        self.branches().find_map(|(id, branch)| {
            branch
                .position_of_number(number)
                .map(|index| (id, index))
        })
    }

    /// First to last commit number of the first branch called `name`.
    pub fn commit_numbers_for_branch(&self, name: &str) -> Option<CommitRange> {
        self.branches()
            .filter(|(_, b)| b.name() == Some(name))
            .find_map(|(_, b)| {
                let start = b.first_number()?;
                let end = b.last_number()?;
                Some(CommitRange { start, end })
            })
    }

    /// Commit number of the single commit whose hash starts with `prefix`.
    ///
    /// No match and more than one match both yield `None`.
    pub fn commit_number_for_hash(&self, prefix: &str) -> Option<usize> {
        if prefix.is_empty() {
            return None;
        }
        let mut found = None;
        for (_, branch) in self.branches() {
            for commit in branch.commits() {
                if commit.hash.starts_with(prefix) {
                    if found.is_some() {
                        return None;
                    }
                    found = Some(commit.number);
                }
            }
        }
        found
    }

    /// Range between two hash prefixes, when both resolve and are ordered.
    pub fn commit_numbers_for_hash_range(&self, start: &str, end: &str) -> Option<CommitRange> {
        let start = self.commit_number_for_hash(start)?;
        let end = self.commit_number_for_hash(end)?;
        CommitRange::new(start, end).ok()
    }

    /// Debug view of every branch, in order.
    pub fn summary(&self) -> Vec<BranchSummary> {
        self.branches()
            .map(|(_, branch)| BranchSummary {
                name: branch.replay_name(),
                source: branch.source().map(|s| self.branch(s).replay_name()),
                commits: branch
                    .commits()
                    .iter()
                    .map(|c| match &c.tag {
                        Some(tag) => format!("{} -> {}", c.message, tag),
                        None => c.message.clone(),
                    })
                    .collect(),
                merges: branch
                    .merges()
                    .iter()
                    .map(|(index, records)| {
                        let rendered = records
                            .iter()
                            .map(|m| format!("{} ({})", self.branch(m.target).replay_name(), m.comment))
                            .collect::<Vec<_>>()
                            .join(", ");
                        (*index, rendered)
                    })
                    .collect(),
                closed: branch.is_closed(),
            })
            .collect()
    }

    pub(crate) fn branch_mut(&mut self, id: BranchId) -> &mut Branch {
        &mut self.branches[id.0]
    }

    /// Register a branch and index its commits.
    pub(crate) fn add_branch(&mut self, branch: Branch) -> BranchId {
        let id = BranchId(self.branches.len());
        for commit in branch.commits() {
            self.owners.insert(commit.hash.clone(), id);
        }
        self.branches.push(branch);
        self.order.push(id);
        id
    }

    /// Append `commit` to branch `id`, reopening it.
    pub(crate) fn push_commit(&mut self, id: BranchId, commit: Commit) {
        self.owners.insert(commit.hash.clone(), id);
        self.branch_mut(id).push(commit);
    }

    /// Branches whose last commit has `hash`.
    pub(crate) fn branches_ending_with(&self, hash: &str) -> Vec<BranchId> {
        self.branches()
            .filter(|(_, b)| b.last_commit().is_some_and(|c| c.hash == hash))
            .map(|(id, _)| id)
            .collect()
    }

    /// Move every commit after `hash` on branch `id` into a new branch and
    /// return its id. `None` when the branch does not hold `hash`.
    pub(crate) fn split_after(&mut self, id: BranchId, hash: &str) -> Option<BranchId> {
        let index = self.branch(id).position_of_hash(hash)?;
        let tail = self.branch_mut(id).split_off_after(id, index);
        Some(self.add_branch(tail))
    }

    /// After a split moved commits from `from` to `to`, rewrite the merge
    /// records and fork sources that followed those commits.
    pub(crate) fn transfer_merges(&mut self, from: BranchId, to: BranchId) -> usize {
        let owners = &self.owners;
        self.branches
            .iter_mut()
            .map(|branch| branch.retarget(from, to, owners))
            .sum()
    }

    /// Append every commit of `from` to `into` and drop `from` from the
    /// branch order. Merge records are re-keyed past `into`'s commits, and
    /// everything that pointed at `from` points at `into`. `into` takes
    /// `from`'s closed state, and its name when it has none.
    pub(crate) fn absorb(&mut self, into: BranchId, from: BranchId) -> usize {
        let absorbed = std::mem::take(self.branch_mut(from));
        for commit in &absorbed.commits {
            self.owners.insert(commit.hash.clone(), into);
        }

        let target = self.branch_mut(into);
        let offset = target.commits.len();
        target.commits.extend(absorbed.commits);
        for (index, records) in absorbed.merges {
            target.merges.entry(index + offset).or_default().extend(records);
        }
        target.closed = absorbed.closed;
        if target.name.is_none() {
            target.name = absorbed.name;
        }

        self.order.retain(|&id| id != from);
        self.branches
            .iter_mut()
            .map(|branch| branch.repoint(from, into))
            .sum()
    }

    /// Attach `tag` to the commit with exactly `hash`.
    pub(crate) fn tag_commit(&mut self, hash: &str, tag: &str) -> bool {
        let Some(id) = self.owner_of(hash) else {
            return false;
        };
        let branch = self.branch_mut(id);
        match branch.commits.iter_mut().find(|c| c.hash == hash) {
            Some(commit) => {
                commit.tag = Some(tag.to_string());
                true
            }
            None => false,
        }
    }

    /// Order branches by ascending first commit number.
    pub(crate) fn sort_by_first_commit(&mut self) {
        let branches = &self.branches;
        self.order
            .sort_by_key(|id| branches[id.0].first_number());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(number: usize, hash: &str, parents: &[&str]) -> Commit {
        Commit::new(
            number,
            hash,
            parents.iter().map(|p| p.to_string()).collect(),
            format!("commit {number}"),
        )
    }

    fn linear(hashes: &[&str]) -> CommitGraph {
        let mut graph = CommitGraph::new();
        let commits = hashes
            .iter()
            .enumerate()
            .map(|(n, h)| commit(n, h, &[]))
            .collect();
        graph.add_branch(Branch::new(None, commits));
        graph
    }

    #[test]
    fn test_commit_range_rejects_reversed_bounds() {
        assert!(CommitRange::new(3, 2).is_err());
        let range = CommitRange::new(2, 4).unwrap();
        assert_eq!(range.len(), 3);
        assert!(range.contains(4));
        assert!(!range.contains(5));
    }

    #[test]
    fn test_split_after_reindexes_owners() {
        let mut graph = linear(&["a1", "b2", "c3", "d4"]);
        let root = BranchId(0);
        let tail = graph.split_after(root, "b2").unwrap();

        assert_eq!(graph.owner_of("a1"), Some(root));
        assert_eq!(graph.owner_of("c3"), Some(tail));
        assert_eq!(graph.owner_of("d4"), Some(tail));
        assert_eq!(graph.branch(tail).source(), Some(root));
        assert_eq!(graph.commit_count(), 4);
    }

    #[test]
    fn test_split_after_unknown_hash() {
        let mut graph = linear(&["a1", "b2"]);
        assert!(graph.split_after(BranchId(0), "zz").is_none());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_absorb_appends_commits_and_repoints() {
        let mut graph = CommitGraph::new();
        let trunk = graph.add_branch(Branch::new(None, vec![commit(0, "a", &[])]));
        let mut side = Branch::new(Some(trunk), vec![commit(1, "b", &["a"])]);
        side.name = Some("side".into());
        let side = graph.add_branch(side);
        let child = graph.add_branch(Branch::new(Some(side), vec![commit(2, "c", &["b"])]));

        graph.absorb(trunk, side);

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.owner_of("b"), Some(trunk));
        assert_eq!(graph.branch(trunk).commits().len(), 2);
        assert_eq!(graph.branch(trunk).name(), Some("side"));
        assert_eq!(graph.branch(child).source(), Some(trunk));
        assert!(graph.branch(side).commits().is_empty());
        assert_eq!(graph.locate(1), Some((trunk, 1)));
    }

    #[test]
    fn test_hash_prefix_lookup() {
        let graph = linear(&["abc1", "abd2", "ffe3"]);
        assert_eq!(graph.commit_number_for_hash("ffe"), Some(2));
        assert_eq!(graph.commit_number_for_hash("abc"), Some(0));
        // Two matches collapse to "not found".
        assert_eq!(graph.commit_number_for_hash("ab"), None);
        assert_eq!(graph.commit_number_for_hash("zzz"), None);
        assert_eq!(graph.commit_number_for_hash(""), None);
    }

    #[test]
    fn test_hash_range_requires_order() {
        let graph = linear(&["abc1", "abd2", "ffe3"]);
        assert_eq!(
            graph.commit_numbers_for_hash_range("abc", "ffe"),
            Some(CommitRange { start: 0, end: 2 })
        );
        assert_eq!(graph.commit_numbers_for_hash_range("ffe", "abc"), None);
    }

    #[test]
    fn test_locate_and_tag() {
        let mut graph = linear(&["a1", "b2", "c3"]);
        let tail = graph.split_after(BranchId(0), "a1").unwrap();
        assert_eq!(graph.locate(2), Some((tail, 1)));
        assert_eq!(graph.locate(0), Some((BranchId(0), 0)));
        assert_eq!(graph.locate(9), None);

        assert!(graph.tag_commit("c3", "v1.0"));
        assert!(!graph.tag_commit("nope", "v2.0"));
        assert_eq!(graph.find_commit("c3").unwrap().tag.as_deref(), Some("v1.0"));
    }
}
