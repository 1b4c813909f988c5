//! autopatch core library
//!
//! Reconstructs the branch topology of a repository from its flattened
//! commit log and replays a selected commit range onto another repository,
//! reproducing branches, merges and tags along the way.

pub mod config;
pub mod error;
pub mod fakes;
pub mod history;
pub mod obs;
pub mod replay;
pub mod session;
pub mod telemetry;
pub mod vcs;

pub use config::{ParamValue, PatcherConfig, Selection};
pub use error::{AutopatchError, ConfigError, GraphError, PlanError, Result, VcsError};
pub use history::{
    Branch, BranchId, BranchSummary, Commit, CommitGraph, CommitGraphBuilder, CommitRange, Merge,
};
pub use replay::{plan, ExecutionSummary, ReplayTask, TaskExecutor};
pub use telemetry::init_tracing;
pub use session::{gather_history, prepare_destination, replay, resolve_range};
pub use vcs::{DestinationRepository, DestinationStatus, GitCli, SourceRepository, VcsResult};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
