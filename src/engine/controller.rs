// src/engine/controller.rs

use std::sync::Arc;

use tracing::info;

use crate::config::RunConfig;
use crate::dag::{JobGraph, ResourceBudget, RunReport, Scheduler};
use crate::engine::Shutdown;
use crate::errors::Result;
use crate::exec::{BackendProbe, BackendSelector, CommandRunner};
use crate::job::{EchoMessage, Greeting, MasterLog, RunContext};
use crate::types::Backend;

/// Name of the root job of the stock pipeline.
pub const HELLO_JOB: &str = "hello";
/// Name of the child job of the stock pipeline.
pub const MESSAGE_JOB: &str = "hello_message";

/// Drives one end-to-end run.
///
/// Owns the resolved configuration, the backend selector and the master
/// log. Adds no policy of its own: it builds the graph, resolves the backend
/// and hands both to the [`Scheduler`].
#[derive(Debug)]
pub struct RunController {
    config: Arc<RunConfig>,
    selector: BackendSelector,
    log: MasterLog,
    shutdown: Shutdown,
}

impl RunController {
    pub fn new(config: RunConfig) -> Self {
        Self::with_selector(config, BackendSelector::default())
    }

    /// Use `probe` instead of looking engines up on `PATH`.
    pub fn with_probe(config: RunConfig, probe: impl BackendProbe + 'static) -> Self {
        Self::with_selector(config, BackendSelector::new(probe))
    }

    fn with_selector(config: RunConfig, selector: BackendSelector) -> Self {
        Self {
            config: config.shared(),
            selector,
            log: MasterLog::new(),
            shutdown: Shutdown::never(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn master_log(&self) -> &MasterLog {
        &self.log
    }

    /// Backend for this run; probed on first call, cached afterwards.
    pub fn backend(&self) -> Result<Backend> {
        self.selector.resolve(&self.config)
    }

    /// The stock pipeline: `hello` logs a greeting, then `hello_message`
    /// echoes the configured message.
    pub fn build_graph(&self) -> Result<JobGraph> {
        let mut graph = JobGraph::new();

        let head = graph.add_job(
            HELLO_JOB,
            self.config.resources_for(HELLO_JOB),
            Greeting::default(),
        )?;
        let child = graph.add_job(
            MESSAGE_JOB,
            self.config.resources_for(MESSAGE_JOB),
            EchoMessage,
        )?;
        graph.add_dependency(head, child)?;

        Ok(graph)
    }

    /// Build and run the stock pipeline.
    pub async fn execute(&self) -> Result<RunReport> {
        let graph = self.build_graph()?;
        self.execute_graph(&graph).await
    }

    /// Run an arbitrary graph with this controller's configuration.
    ///
    /// Cycles, oversize requests and an unavailable backend are all reported
    /// before any job starts.
    pub async fn execute_graph(&self, graph: &JobGraph) -> Result<RunReport> {
        graph.validate()?;
        let backend = self.backend()?;

        let runner = CommandRunner::new(Arc::clone(&self.config), self.shutdown.clone());
        let ctx = RunContext::new(Arc::clone(&self.config), self.log.clone(), runner, backend);

        let mut scheduler = Scheduler::new(ResourceBudget::from_config(&self.config))
            .with_shutdown(self.shutdown.clone());

        info!(backend = %backend, jobs = graph.len(), "executing pipeline");
        scheduler.run(graph, &ctx).await
    }
}
