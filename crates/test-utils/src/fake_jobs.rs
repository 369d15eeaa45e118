use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use jobdag::errors::JobdagError;
use jobdag::exec::BackendProbe;
use jobdag::job::{Job, JobContext, JobFuture};

/// Shared record of what fake jobs did.
///
/// - `started` lists job names in the order their `run` was entered.
/// - `max_concurrent` is the peak number of jobs inside `run` at once.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    started: Arc<Mutex<Vec<String>>>,
    current: Arc<AtomicUsize>,
    max_concurrent: Arc<AtomicUsize>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }

    fn enter(&self, name: &str) {
        self.started.lock().unwrap().push(name.to_string());
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A job that records its start, optionally sleeps, then succeeds or fails.
#[derive(Debug, Clone)]
pub struct RecordingJob {
    recorder: Recorder,
    delay: Duration,
    fail: bool,
}

impl RecordingJob {
    pub fn ok(recorder: &Recorder) -> Self {
        Self {
            recorder: recorder.clone(),
            delay: Duration::ZERO,
            fail: false,
        }
    }

    pub fn failing(recorder: &Recorder) -> Self {
        Self {
            fail: true,
            ..Self::ok(recorder)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Job for RecordingJob {
    fn run<'a>(&'a self, ctx: &'a JobContext) -> JobFuture<'a> {
        Box::pin(async move {
            self.recorder.enter(ctx.job_name());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.recorder.leave();

            if self.fail {
                Err(JobdagError::Other(anyhow!("{} failed on purpose", ctx.job_name())))
            } else {
                ctx.log_to_master(format!("{} done", ctx.job_name()));
                Ok(())
            }
        })
    }
}

/// Runs a fixed command with the run's backend and logs its stdout.
#[derive(Debug, Clone)]
pub struct CommandJob {
    args: Vec<String>,
}

impl CommandJob {
    pub fn new(args: &[&str]) -> Self {
        Self {
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// `sh -c <script>`.
    pub fn shell(script: &str) -> Self {
        Self::new(&["sh", "-c", script])
    }
}

impl Job for CommandJob {
    fn run<'a>(&'a self, ctx: &'a JobContext) -> JobFuture<'a> {
        Box::pin(async move {
            let output = ctx.check_output(self.args.clone()).await?;
            ctx.log_to_master(output.trim_end());
            Ok(())
        })
    }
}

/// Never finishes on its own; used to exercise shutdown.
#[derive(Debug, Clone, Default)]
pub struct HangingJob;

impl Job for HangingJob {
    fn run<'a>(&'a self, _ctx: &'a JobContext) -> JobFuture<'a> {
        Box::pin(async move {
            std::future::pending::<()>().await;
            Ok(())
        })
    }
}

/// Pretends exactly the listed executables are installed, and counts probes.
#[derive(Debug, Clone, Default)]
pub struct FakeProbe {
    available: HashSet<String>,
    calls: Arc<AtomicUsize>,
}

impl FakeProbe {
    pub fn with(executables: &[&str]) -> Self {
        Self {
            available: executables.iter().map(|s| s.to_string()).collect(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn none() -> Self {
        Self::with(&[])
    }

    /// Handle that keeps counting after the probe is moved into a selector.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl BackendProbe for FakeProbe {
    fn is_available(&self, executable: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.available.contains(executable)
    }
}
