// src/dag/mod.rs

//! Job graph representation and scheduling.
//!
//! - [`graph`] holds the jobs and their parent → child edges.
//! - [`scheduler`] walks the graph, dispatching jobs whose parents have
//!   succeeded and skipping the descendants of failures.
//! - [`budget`] tracks cores, memory and worker slots in use.
//! - [`state`] defines per-job states and outcomes.
//! - [`report`] is the final `RunReport`.

pub mod budget;
pub mod graph;
pub mod report;
pub mod scheduler;
pub mod state;

pub use budget::ResourceBudget;
pub use graph::{JobGraph, JobId, JobNode};
pub use report::{FailureDetail, JobResult, RunReport};
pub use scheduler::Scheduler;
pub use state::{JobOutcome, JobState, SkipReason};
