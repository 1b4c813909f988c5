//! Error taxonomy for autopatch.
//!
//! Errors fall into four classes that abort at different stages:
//! graph construction, range planning, configuration, and execution against
//! the destination repository. None of them are retried.

use std::path::PathBuf;

/// Errors raised while reconstructing branches from the commit log.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("malformed log line {number}: {line:?}")]
    MalformedLogLine { number: usize, line: String },

    #[error("commit {hash} appears more than once in the log")]
    DuplicateCommit { hash: String },

    #[error("no branch contains parent {parent} of commit {hash}")]
    MissingParent { hash: String, parent: String },

    #[error("parent {parent} of commit {hash} is the tip of more than one branch")]
    AmbiguousParent { hash: String, parent: String },

    #[error("no destination branch contains {parent} for merge commit {hash}")]
    MissingMergeDestination { hash: String, parent: String },

    #[error("no source branch contains {parent} for merge commit {hash}")]
    MissingMergeSource { hash: String, parent: String },

    #[error("splitting after {parent} for merge commit {hash} leaves an empty branch")]
    EmptySplit { hash: String, parent: String },

    #[error("tip {hash} of live branch '{branch}' is not part of the reconstructed history")]
    TipNotFound { branch: String, hash: String },

    #[error("tip {hash} of live branch '{branch}' ends more than one branch")]
    AmbiguousTip { branch: String, hash: String },
}

/// Errors raised while turning a commit range into replay tasks.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("invalid commit range {start}..={end}")]
    InvalidRange { start: usize, end: usize },

    #[error("{count} commits from number {start} run past the largest commit number")]
    CountOverflow { start: usize, count: usize },

    #[error("no branch owns commit number {number}")]
    CommitNotFound { number: usize },

    #[error("no branch named '{name}'")]
    UnknownBranch { name: String },

    #[error("hash '{prefix}' does not resolve to exactly one commit")]
    UnresolvedHash { prefix: String },
}

/// Errors reported by the version-control collaborator.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("patch file {path:?}: {source}")]
    PatchFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create directory {path:?}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("operation rejected: {0}")]
    Rejected(String),
}

/// Errors in the flat `key=value` parameter set.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing parameter in commandline ({0})")]
    MissingParameter(&'static str),

    #[error("parameter '{key}' expects {expected}, got {value:?}")]
    InvalidValue {
        key: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("conflicting selection parameters: {0}")]
    ConflictingSelection(String),
}

/// Top-level autopatch error.
#[derive(Debug, thiserror::Error)]
pub enum AutopatchError {
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("vcs error: {0}")]
    Vcs(#[from] VcsError),

    #[error("task {index} ({task}) failed: {source}")]
    TaskFailed {
        index: usize,
        task: String,
        #[source]
        source: VcsError,
    },

    #[error("destination {path:?} is not available")]
    DestinationUnavailable { path: PathBuf },
}

/// Result type for autopatch operations.
pub type Result<T> = std::result::Result<T, AutopatchError>;
