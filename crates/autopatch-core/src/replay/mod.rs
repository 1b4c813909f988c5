//! Planning and executing the replay of a commit range.
//!
//! - [`planner::plan`]: graph + range to an ordered task list
//! - [`executor::TaskExecutor`]: runs the list against the destination, fail-fast

pub mod executor;
pub mod planner;
pub mod task;

pub use executor::{ExecutionSummary, TaskExecutor};
pub use planner::plan;
pub use task::ReplayTask;
