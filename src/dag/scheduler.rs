// src/dag/scheduler.rs

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::task::{self, AbortHandle, JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::dag::budget::ResourceBudget;
use crate::dag::graph::{JobGraph, JobId};
use crate::dag::report::{FailureDetail, JobResult, RunReport};
use crate::dag::state::{JobOutcome, JobState, SkipReason};
use crate::engine::Shutdown;
use crate::errors::{JobdagError, Result};
use crate::job::RunContext;

/// Walks a [`JobGraph`] and runs its jobs.
///
/// It is responsible for:
/// - rejecting graphs with cycles or unsatisfiable resource requests
/// - dispatching a job once all of its parents succeeded, in insertion order
/// - holding jobs back while the resource budget cannot fit them
/// - skipping every descendant of a failed job
/// - stopping dispatch on shutdown and terminating stragglers after the
///   grace period
///
/// Eligibility checks and budget accounting happen on this single loop;
/// each job body runs on its own tokio task.
#[derive(Debug)]
pub struct Scheduler {
    budget: ResourceBudget,
    shutdown: Shutdown,
}

/// Mutable bookkeeping for one call to [`Scheduler::run`].
struct RunState {
    states: Vec<JobState>,
    errors: Vec<Option<String>>,
    first_failure: Option<FailureDetail>,
    running: HashMap<JobId, AbortHandle>,
    tasks: HashMap<task::Id, JobId>,
    workers: JoinSet<Result<()>>,
}

impl Scheduler {
    pub fn new(budget: ResourceBudget) -> Self {
        Self {
            budget,
            shutdown: Shutdown::never(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn budget(&self) -> &ResourceBudget {
        &self.budget
    }

    /// Structural checks performed before any job runs.
    pub fn check(&self, graph: &JobGraph) -> Result<()> {
        graph.validate()?;

        for id in graph.job_ids() {
            let node = &graph[id];
            if !self.budget.can_ever_fit(&node.resources) {
                return Err(JobdagError::InvalidResources(format!(
                    "job '{}' requests {} but the run budget is {} core(s), {} bytes",
                    node.name,
                    node.resources,
                    self.budget.max_cores(),
                    self.budget.max_memory()
                )));
            }
        }

        Ok(())
    }

    /// Run every job of `graph` to a terminal state.
    ///
    /// Returns `Err` only for structural problems found before the first
    /// dispatch; job failures are reported in the [`RunReport`].
    pub async fn run(&mut self, graph: &JobGraph, ctx: &RunContext) -> Result<RunReport> {
        self.check(graph)?;

        let mut run = RunState {
            states: vec![JobState::Pending; graph.len()],
            errors: vec![None; graph.len()],
            first_failure: None,
            running: HashMap::new(),
            tasks: HashMap::new(),
            workers: JoinSet::new(),
        };

        let mut shutdown = self.shutdown.clone();
        let grace = ctx.config().grace_period;
        let mut deadline: Option<Instant> = None;
        let mut forced = false;

        info!(jobs = graph.len(), backend = %ctx.backend(), "starting run");

        loop {
            if deadline.is_none() && !shutdown.is_requested() {
                self.dispatch_ready(graph, ctx, &mut run);
            }

            if run.workers.is_empty() {
                break;
            }

            tokio::select! {
                joined = run.workers.join_next_with_id() => match joined {
                    Some(Ok((task, result))) => self.task_finished(graph, task, result, &mut run),
                    Some(Err(e)) => self.task_finished(graph, e.id(), Err(lost(&e)), &mut run),
                    None => break,
                },
                _ = shutdown.requested(), if deadline.is_none() => {
                    warn!(
                        running = run.running.len(),
                        grace_secs = grace.as_secs_f64(),
                        "shutdown requested; no further jobs will be dispatched"
                    );
                    deadline = Some(Instant::now() + grace);
                    for state in run.states.iter_mut() {
                        if *state == JobState::Pending {
                            *state = JobState::Skipped(SkipReason::Cancelled);
                        }
                    }
                }
                _ = sleep_until(deadline), if deadline.is_some() && !forced => {
                    forced = true;
                    warn!(running = run.running.len(), "grace period elapsed; terminating running jobs");
                    for handle in run.running.values() {
                        handle.abort();
                    }
                }
            }
        }

        Ok(self.finish(graph, run))
    }

    fn dispatch_ready(&mut self, graph: &JobGraph, ctx: &RunContext, run: &mut RunState) {
        for id in graph.job_ids() {
            if run.states[id.index()] != JobState::Pending {
                continue;
            }

            let parents_done = graph
                .parents(id)
                .iter()
                .all(|p| run.states[p.index()] == JobState::Succeeded);
            if !parents_done {
                continue;
            }

            let node = &graph[id];
            if !self.budget.try_reserve(&node.resources) {
                debug!(job = %node.name, resources = %node.resources, "eligible but waiting for resources");
                continue;
            }

            run.states[id.index()] = JobState::Running;
            info!(job = %node.name, resources = %node.resources, "dispatching job");

            let job = Arc::clone(&node.job);
            let job_ctx = ctx.for_job(&node.name);
            let handle = run.workers.spawn(async move { job.run(&job_ctx).await });
            run.tasks.insert(handle.id(), id);
            run.running.insert(id, handle);
        }
    }

    /// Map a finished tokio task back to its job.
    fn task_finished(
        &mut self,
        graph: &JobGraph,
        task: task::Id,
        result: Result<()>,
        run: &mut RunState,
    ) {
        match run.tasks.remove(&task) {
            Some(id) => self.complete(graph, id, result, run),
            None => error!(task = %task, "finished task does not belong to any job"),
        }
    }

    fn complete(&mut self, graph: &JobGraph, id: JobId, result: Result<()>, run: &mut RunState) {
        let node = &graph[id];
        self.budget.release(&node.resources);
        run.running.remove(&id);

        match result {
            Ok(()) => {
                run.states[id.index()] = JobState::Succeeded;
                info!(job = %node.name, "job succeeded");
            }
            Err(err) => {
                run.states[id.index()] = JobState::Failed;
                error!(job = %node.name, error = %err, "job failed; skipping its descendants");

                if run.first_failure.is_none() {
                    run.first_failure = Some(FailureDetail {
                        job: node.name.clone(),
                        error: err.to_string(),
                        stderr: err.captured_stderr().unwrap_or_default().to_string(),
                    });
                }
                run.errors[id.index()] = Some(err.to_string());

                for descendant in graph.descendants(id) {
                    let state = &mut run.states[descendant.index()];
                    if *state == JobState::Pending {
                        debug!(job = %graph.name(descendant), ancestor = %node.name, "skipping job");
                        *state = JobState::Skipped(SkipReason::DependencyFailed {
                            ancestor: node.name.clone(),
                        });
                    }
                }
            }
        }
    }

    fn finish(&self, graph: &JobGraph, mut run: RunState) -> RunReport {
        let mut jobs = Vec::with_capacity(graph.len());

        for id in graph.job_ids() {
            let i = id.index();
            let state = match &run.states[i] {
                // Only reachable if a worker task itself was lost.
                JobState::Running => {
                    run.errors[i] = Some("job worker aborted".to_string());
                    JobState::Failed
                }
                JobState::Pending => JobState::Skipped(SkipReason::Cancelled),
                other => other.clone(),
            };

            let Some(outcome) = state.outcome() else {
                continue;
            };
            let skip_reason = match state {
                JobState::Skipped(reason) => Some(reason),
                _ => None,
            };

            jobs.push(JobResult {
                name: graph.name(id).to_string(),
                outcome,
                skip_reason,
                error: run.errors[i].take(),
            });
        }

        // A run cut short by shutdown is not a success even if nothing failed.
        let success = jobs.iter().all(|j| {
            j.outcome != JobOutcome::Failed && j.skip_reason != Some(SkipReason::Cancelled)
        });

        info!(
            success,
            jobs = jobs.len(),
            first_failure = run.first_failure.as_ref().map(|f| f.job.as_str()),
            "run finished"
        );

        RunReport {
            jobs,
            success,
            first_failure: run.first_failure,
        }
    }
}

/// Error recorded for a job whose task panicked or was aborted.
fn lost(e: &JoinError) -> JobdagError {
    if e.is_cancelled() {
        JobdagError::Other(anyhow!("job terminated by shutdown"))
    } else {
        JobdagError::Other(anyhow!("job panicked: {e}"))
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
