//! Turns a commit range of a reconstructed graph into replay tasks.
//!
//! The plan reproduces branch and merge operations, not just commit
//! content, so the destination ends up with the same topology even when it
//! starts out empty.

use crate::error::PlanError;
use crate::history::{BranchId, CommitGraph, CommitRange};
use crate::replay::task::ReplayTask;

/// Plan the replay of `range`, in ascending commit number order.
///
/// Every number in the range must belong to a branch of `graph`.
pub fn plan(graph: &CommitGraph, range: CommitRange) -> Result<Vec<ReplayTask>, PlanError> {
    let name_of = |id: BranchId| graph.branch(id).replay_name();

    let mut tasks = Vec::new();
    let mut active: Option<BranchId> = None;

    for number in range.start..=range.end {
        let (id, index) = graph
            .locate(number)
            .ok_or(PlanError::CommitNotFound { number })?;
        let branch = graph.branch(id);
        let commit = &branch.commits()[index];

        // The very first commit of a repository lands on its default branch.
        if active != Some(id) {
            if number > 0 {
                if let Some(source) = branch.source() {
                    if active != Some(source) && index == 0 {
                        tasks.push(ReplayTask::Checkout {
                            branch: name_of(source),
                        });
                    }
                }
                tasks.push(ReplayTask::Checkout {
                    branch: branch.replay_name(),
                });
            }
            active = Some(id);
        }

        if !commit.is_merge() {
            tasks.push(ReplayTask::Patch {
                hash: commit.hash.clone(),
                message: commit.message.clone(),
            });
        }

        if let Some(tag) = &commit.tag {
            tasks.push(ReplayTask::Tag { name: tag.clone() });
        }

        if number == range.end {
            continue;
        }
        let merges = branch.merges_at(index);
        let Some(last) = merges.last() else {
            continue;
        };

        for merge in merges {
            tasks.push(ReplayTask::Merge {
                target: name_of(merge.target),
                source: branch.replay_name(),
                message: merge.comment.clone(),
            });
        }
        tasks.push(ReplayTask::Checkout {
            branch: name_of(last.target),
        });
        active = Some(last.target);

        if branch.is_closed() && !branch.has_merges_after(index) {
            tasks.push(ReplayTask::DeleteBranch {
                branch: branch.replay_name(),
            });
        }
    }

    Ok(tasks)
}
