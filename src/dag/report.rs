// src/dag/report.rs

//! Final outcome of a run.

use std::fmt;

use crate::dag::state::{JobOutcome, SkipReason};

/// Outcome of a single job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub name: String,
    pub outcome: JobOutcome,
    /// Set when `outcome == Skipped`.
    pub skip_reason: Option<SkipReason>,
    /// Error message when `outcome == Failed`.
    pub error: Option<String>,
}

/// The first job failure of a run, kept verbatim for diagnosis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureDetail {
    pub job: String,
    pub error: String,
    /// Captured stderr of the failing command, if the failure came from one.
    pub stderr: String,
}

/// Per-job outcomes plus the overall verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// One entry per job, in graph insertion order.
    pub jobs: Vec<JobResult>,
    /// `true` iff no job failed and none was cancelled by shutdown.
    pub success: bool,
    pub first_failure: Option<FailureDetail>,
}

impl RunReport {
    pub fn outcome(&self, job: &str) -> Option<JobOutcome> {
        self.job(job).map(|r| r.outcome)
    }

    pub fn job(&self, job: &str) -> Option<&JobResult> {
        self.jobs.iter().find(|r| r.name == job)
    }

    pub fn count(&self, outcome: JobOutcome) -> usize {
        self.jobs.iter().filter(|r| r.outcome == outcome).count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "run {} ({} succeeded, {} failed, {} skipped)",
            if self.success { "succeeded" } else { "failed" },
            self.count(JobOutcome::Succeeded),
            self.count(JobOutcome::Failed),
            self.count(JobOutcome::Skipped),
        )?;
        for job in &self.jobs {
            write!(f, "  {}: {}", job.name, job.outcome)?;
            if let Some(reason) = &job.skip_reason {
                write!(f, " ({reason})")?;
            }
            if let Some(error) = &job.error {
                write!(f, " ({error})")?;
            }
            writeln!(f)?;
        }
        if let Some(failure) = &self.first_failure {
            writeln!(f, "first failure: {}", failure.job)?;
            if !failure.stderr.is_empty() {
                writeln!(f, "captured stderr:")?;
                write!(f, "{}", failure.stderr)?;
                if !failure.stderr.ends_with('\n') {
                    writeln!(f)?;
                }
            }
        }
        Ok(())
    }
}
