//! Reconstruction of branches and merges from a linear, oldest-first log.
//!
//! Branch boundaries are not part of the log. They are discovered while the
//! commits stream in, and corrected retroactively: a merge whose two parents
//! live on the same inferred branch shows that the branch forked earlier, so
//! its tail is split off and merge records made from that tail are moved to
//! the new branch.
//!
//! The first-parent line of a merge is the branch that continues. When the
//! log lists the merged side first, the trunk is inferred as a fork of it,
//! and the merge turns the two around.

use tracing::{debug, warn};

use crate::error::GraphError;
use crate::history::branch::{Branch, BranchId};
use crate::history::commit::Commit;
use crate::history::graph::CommitGraph;
use crate::obs;

/// Incremental builder for a [`CommitGraph`].
///
/// Commits must be pushed in strictly increasing number order. Any error
/// leaves the builder in an unspecified state; drop it.
#[derive(Debug, Default)]
pub struct CommitGraphBuilder {
    graph: CommitGraph,
    next_number: usize,
}

impl CommitGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a complete graph from log lines, live branch tips
    /// (`name`, `hash`) and tags (`hash`, `tag`).
    pub fn build<S: AsRef<str>>(
        lines: &[S],
        tips: &[(String, String)],
        tags: &[(String, String)],
    ) -> Result<CommitGraph, GraphError> {
        let mut builder = Self::new();
        for line in lines {
            builder.push_line(line.as_ref())?;
        }
        builder.reconcile_tips(tips)?;
        builder.apply_tags(tags);
        Ok(builder.finish())
    }

    /// Graph built so far.
    pub fn graph(&self) -> &CommitGraph {
        &self.graph
    }

    /// Parse and push one log line, numbering it after the previous one.
    /// Blank lines are skipped.
    pub fn push_line(&mut self, line: &str) -> Result<(), GraphError> {
        if line.trim().is_empty() {
            return Ok(());
        }
        let commit = Commit::parse(self.next_number, line)?;
        self.push(commit)
    }

    /// Place `commit` on a branch according to its parent count.
    pub fn push(&mut self, commit: Commit) -> Result<(), GraphError> {
        if self.graph.owner_of(&commit.hash).is_some() {
            return Err(GraphError::DuplicateCommit { hash: commit.hash });
        }
        self.next_number = commit.number + 1;

        match commit.parent_hashes.len() {
            0 => {
                let id = self.graph.add_branch(Branch::new(None, vec![commit]));
                debug!(branch = %id, "root commit starts a branch");
                Ok(())
            }
            1 => self.push_child(commit),
            _ => self.push_merge(commit),
        }
    }

    fn push_child(&mut self, commit: Commit) -> Result<(), GraphError> {
        let parent = commit.parent_hashes[0].clone();
        let tips = self.graph.branches_ending_with(&parent);

        match tips.as_slice() {
            [id] => {
                self.graph.push_commit(*id, commit);
                Ok(())
            }
            [] => match self.graph.owner_of(&parent) {
                // Parent already has a successor on its branch: this commit forks.
                Some(owner) => {
                    let id = self.graph.add_branch(Branch::new(Some(owner), vec![commit]));
                    debug!(branch = %id, source = %owner, parent = %parent, "fork from mid-branch parent");
                    Ok(())
                }
                None => Err(GraphError::MissingParent {
                    hash: commit.hash,
                    parent,
                }),
            },
            _ => Err(GraphError::AmbiguousParent {
                hash: commit.hash,
                parent,
            }),
        }
    }

    fn push_merge(&mut self, commit: Commit) -> Result<(), GraphError> {
        let first = &commit.parent_hashes[0];
        let mut destination =
            self.graph
                .owner_of(first)
                .ok_or_else(|| GraphError::MissingMergeDestination {
                    hash: commit.hash.clone(),
                    parent: first.clone(),
                })?;

        for parent in &commit.parent_hashes[1..] {
            let mut source =
                self.graph
                    .owner_of(parent)
                    .ok_or_else(|| GraphError::MissingMergeSource {
                        hash: commit.hash.clone(),
                        parent: parent.clone(),
                    })?;

            if source == destination {
                source = self.split_for_merge(destination, &commit)?;
            } else if let Some(merged) = self.swap_inverted_fork(destination, source, parent) {
                destination = source;
                source = merged;
            }

            let branch = self.graph.branch_mut(source);
            if branch.name.is_none() {
                if let Some(name) = commit.merged_branch_name() {
                    branch.name = Some(name.to_string());
                }
            }
            branch.mark_merged(destination, &commit);
        }

        self.graph.push_commit(destination, commit);
        Ok(())
    }

    /// The destination continued past the first parent, so everything after
    /// it is really the merged branch.
    fn split_for_merge(
        &mut self,
        destination: BranchId,
        commit: &Commit,
    ) -> Result<BranchId, GraphError> {
        let first = &commit.parent_hashes[0];
        let empty_split = || GraphError::EmptySplit {
            hash: commit.hash.clone(),
            parent: first.clone(),
        };

        let branch = self.graph.branch(destination);
        let is_tip = branch.last_commit().is_some_and(|c| &c.hash == first);
        if is_tip {
            return Err(empty_split());
        }

        let tail = self
            .graph
            .split_after(destination, first)
            .ok_or_else(empty_split)?;
        Ok(self.migrate_after_split(destination, tail))
    }

    /// `destination` forked from `source`, yet `source` went on past the
    /// fork point up to the merged `parent`. That stretch is the merged
    /// branch: split it off, then hang the destination's commits back on
    /// `source` after the fork point. `source` becomes the destination and
    /// the returned tail the merged branch.
    fn swap_inverted_fork(
        &mut self,
        destination: BranchId,
        source: BranchId,
        parent: &str,
    ) -> Option<BranchId> {
        let forked = self.graph.branch(destination);
        if forked.source() != Some(source) {
            return None;
        }
        let fork_point = forked.fork_point()?.to_string();
        let upstream = self.graph.branch(source);
        let fork_index = upstream.position_of_hash(&fork_point)?;
        if upstream.position_of_hash(parent)? <= fork_index {
            return None;
        }

        let merged = self.graph.split_after(source, &fork_point)?;
        self.migrate_after_split(source, merged);
        let previous = self.graph.branch_mut(source).name.take();
        self.graph.branch_mut(merged).name = previous;
        self.graph.absorb(source, destination);
        debug!(
            trunk = %source,
            merged = %merged,
            fork_point = %fork_point,
            "first-parent line continues the trunk; swapped inverted fork"
        );
        Some(merged)
    }

    fn migrate_after_split(&mut self, original: BranchId, tail: BranchId) -> BranchId {
        let cut = self.graph.branch(tail).first_number().unwrap_or(0);
        let moved = self.graph.transfer_merges(original, tail);
        obs::emit_branch_split(original.0, tail.0, cut, moved);
        tail
    }

    /// Name branches after the live branches whose tips they end with.
    ///
    /// A tip found in the middle of a branch splits it there: the head keeps
    /// the live name, the tail takes over whatever name the branch had.
    pub fn reconcile_tips(&mut self, tips: &[(String, String)]) -> Result<(), GraphError> {
        for (name, hash) in tips {
            let ending = self.graph.branches_ending_with(hash);
            match ending.as_slice() {
                [id] => {
                    self.graph.branch_mut(*id).name = Some(name.clone());
                }
                [] => {
                    let owner =
                        self.graph
                            .owner_of(hash)
                            .ok_or_else(|| GraphError::TipNotFound {
                                branch: name.clone(),
                                hash: hash.clone(),
                            })?;
                    let tail = self.graph.split_after(owner, hash).ok_or_else(|| {
                        GraphError::TipNotFound {
                            branch: name.clone(),
                            hash: hash.clone(),
                        }
                    })?;
                    self.migrate_after_split(owner, tail);

                    let previous = self.graph.branch_mut(owner).name.replace(name.clone());
                    self.graph.branch_mut(tail).name = previous;
                    debug!(branch = %name, tip = %hash, "live tip split an inferred branch");
                }
                _ => {
                    return Err(GraphError::AmbiguousTip {
                        branch: name.clone(),
                        hash: hash.clone(),
                    })
                }
            }
        }
        Ok(())
    }

    /// Attach tags (`hash`, `tag`) to their commits; returns how many landed.
    ///
    /// When several tags point at one commit, the last one wins.
    pub fn apply_tags(&mut self, tags: &[(String, String)]) -> usize {
        let mut applied = 0;
        for (hash, tag) in tags {
            if self.graph.tag_commit(hash, tag) {
                applied += 1;
            } else {
                warn!(tag = %tag, hash = %hash, "tagged commit is not on any local branch");
            }
        }
        applied
    }

    /// Order branches by first commit number and hand out the graph.
    pub fn finish(mut self) -> CommitGraph {
        self.graph.sort_by_first_commit();
        self.graph
    }
}
