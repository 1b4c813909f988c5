//! Branch topology reconstructed from a flattened commit log.
//!
//! Provides:
//! - [`commit::Commit`]: one parsed log line
//! - [`branch::Branch`] / [`branch::Merge`]: inferred branches and the merges made out of them
//! - [`graph::CommitGraph`]: arena of branches with number/hash lookups
//! - [`builder::CommitGraphBuilder`]: the log-order reconstruction, including retroactive splits

pub mod branch;
pub mod builder;
pub mod commit;
pub mod graph;

pub use branch::{Branch, BranchId, Merge};
pub use builder::CommitGraphBuilder;
pub use commit::Commit;
pub use graph::{BranchSummary, CommitGraph, CommitRange};
