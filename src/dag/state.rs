// src/dag/state.rs

//! Per-job state during a run.

use std::fmt;

/// Lifecycle of a job within one run.
///
/// `Pending → Running → {Succeeded | Failed}`, or `Pending → Skipped`.
/// Terminal states are final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped(SkipReason),
}

impl JobState {
    /// Terminal outcome, or `None` while the job is still pending/running.
    pub fn outcome(&self) -> Option<JobOutcome> {
        match self {
            JobState::Pending | JobState::Running => None,
            JobState::Succeeded => Some(JobOutcome::Succeeded),
            JobState::Failed => Some(JobOutcome::Failed),
            JobState::Skipped(_) => Some(JobOutcome::Skipped),
        }
    }
}

/// Why a job never ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// An ancestor failed.
    DependencyFailed { ancestor: String },
    /// The run was shut down before the job was dispatched.
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DependencyFailed { ancestor } => {
                write!(f, "dependency '{ancestor}' failed")
            }
            SkipReason::Cancelled => f.write_str("run was shut down"),
        }
    }
}

/// Terminal outcome reported per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed,
    Skipped,
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobOutcome::Succeeded => "succeeded",
            JobOutcome::Failed => "failed",
            JobOutcome::Skipped => "skipped",
        };
        f.write_str(s)
    }
}
