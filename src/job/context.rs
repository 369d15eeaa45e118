// src/job/context.rs

//! What a running job can see and do.

use std::sync::{Arc, Mutex};

use tracing::info;

use crate::config::RunConfig;
use crate::errors::Result;
use crate::exec::{CommandRunner, CommandSpec, ExecutionResult};
use crate::types::Backend;

/// One line appended to the master log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub job: String,
    pub message: String,
}

/// Append-only log shared by every job of a run.
///
/// Writers may be concurrent; lines keep the order in which appends won the
/// lock, which is not a global order across jobs.
#[derive(Debug, Clone, Default)]
pub struct MasterLog {
    lines: Arc<Mutex<Vec<LogLine>>>,
}

impl MasterLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, job: &str, message: impl Into<String>) {
        let message = message.into();
        info!(target: "jobdag::master", job = %job, "{message}");
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(LogLine {
                job: job.to_string(),
                message,
            });
    }

    /// Snapshot of everything logged so far.
    pub fn lines(&self) -> Vec<LogLine> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Messages logged by one job, in append order.
    pub fn messages_from(&self, job: &str) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|line| line.job == job)
            .map(|line| line.message)
            .collect()
    }
}

/// Run-wide pieces every job shares.
#[derive(Debug, Clone)]
pub struct RunContext {
    config: Arc<RunConfig>,
    log: MasterLog,
    runner: CommandRunner,
    backend: Backend,
}

impl RunContext {
    pub fn new(config: Arc<RunConfig>, log: MasterLog, runner: CommandRunner, backend: Backend) -> Self {
        Self {
            config,
            log,
            runner,
            backend,
        }
    }

    pub fn config(&self) -> &Arc<RunConfig> {
        &self.config
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn master_log(&self) -> &MasterLog {
        &self.log
    }

    /// Context handed to the job called `name`.
    pub fn for_job(&self, name: &str) -> JobContext {
        JobContext {
            name: name.to_string(),
            run: self.clone(),
        }
    }
}

/// Per-job view of the run: configuration, master log and command runner.
#[derive(Debug, Clone)]
pub struct JobContext {
    name: String,
    run: RunContext,
}

impl JobContext {
    pub fn job_name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &RunConfig {
        &self.run.config
    }

    /// Backend resolved for this run.
    pub fn backend(&self) -> Backend {
        self.run.backend
    }

    pub fn log_to_master(&self, message: impl Into<String>) {
        self.run.log.append(&self.name, message);
    }

    /// Run a command with the run's backend and return its full result.
    pub async fn call<I, S>(&self, args: I) -> Result<ExecutionResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.call_with(args, self.run.backend).await
    }

    /// Run a command with an explicit backend, overriding the run's choice.
    pub async fn call_with<I, S>(&self, args: I, backend: Backend) -> Result<ExecutionResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spec = CommandSpec::new(args)?;
        Ok(self.run.runner.execute(&spec, backend).await?)
    }

    /// Run a command and discard its output.
    pub async fn check_call<I, S>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.call(args).await.map(|_| ())
    }

    /// Run a command and return its captured stdout, which must be UTF-8.
    pub async fn check_output<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.check_output_with(args, self.run.backend).await
    }

    /// [`check_output`](Self::check_output) with a per-call backend.
    pub async fn check_output_with<I, S>(&self, args: I, backend: Backend) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spec = CommandSpec::new(args)?;
        Ok(self.run.runner.execute_capture(&spec, backend).await?)
    }
}
