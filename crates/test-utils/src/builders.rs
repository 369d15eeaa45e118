#![allow(dead_code)]

use std::sync::Arc;

use jobdag::config::{ConfigFile, JobSection, RunConfig};
use jobdag::dag::{JobGraph, JobId};
use jobdag::engine::Shutdown;
use jobdag::exec::CommandRunner;
use jobdag::job::{Job, MasterLog, RunContext};
use jobdag::types::{Backend, MemorySize, Resources};

/// Builder for `RunConfig` to simplify test setup.
///
/// Starts from a direct-process backend, four cores, 4G and a zero grace
/// period so tests never depend on docker or singularity being installed.
pub struct RunConfigBuilder {
    file: ConfigFile,
}

impl RunConfigBuilder {
    pub fn new() -> Self {
        let mut file = ConfigFile::default();
        file.run.backend = Some(Backend::DirectProcess);
        file.run.max_cores = Some(4);
        file.run.max_memory = Some(MemorySize::gib(4));
        file.run.grace_period_secs = Some(0);
        Self { file }
    }

    /// Leave the backend unset so it gets probed.
    pub fn probe_backend(mut self) -> Self {
        self.file.run.backend = None;
        self
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.file.run.backend = Some(backend);
        self
    }

    pub fn image(mut self, image: &str) -> Self {
        self.file.run.image = Some(image.to_string());
        self
    }

    pub fn sandbox_image(mut self, image: &str) -> Self {
        self.file.run.sandbox_image = Some(image.to_string());
        self
    }

    pub fn volume(mut self, volume: &str) -> Self {
        self.file.run.volumes.push(volume.to_string());
        self
    }

    pub fn work_dir(mut self, dir: &str) -> Self {
        self.file.run.work_dir = Some(dir.into());
        self
    }

    pub fn max_cores(mut self, n: u32) -> Self {
        self.file.run.max_cores = Some(n);
        self
    }

    pub fn max_memory(mut self, size: MemorySize) -> Self {
        self.file.run.max_memory = Some(size);
        self
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.file.run.max_workers = Some(n);
        self
    }

    pub fn grace_period_secs(mut self, secs: u64) -> Self {
        self.file.run.grace_period_secs = Some(secs);
        self
    }

    pub fn message(mut self, message: &str) -> Self {
        self.file.pipeline.message = message.to_string();
        self
    }

    pub fn total(mut self, total: u32) -> Self {
        self.file.pipeline.total = total;
        self
    }

    pub fn job_resources(mut self, job: &str, cores: u32, memory: MemorySize) -> Self {
        self.file.jobs.insert(
            job.to_string(),
            JobSection {
                cores: Some(cores),
                memory: Some(memory),
            },
        );
        self
    }

    pub fn build(self) -> RunConfig {
        RunConfig::try_from(self.file).expect("Failed to build valid config from builder")
    }
}

impl Default for RunConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `JobGraph` keyed by job name instead of `JobId`.
pub struct JobGraphBuilder {
    graph: JobGraph,
}

impl JobGraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: JobGraph::new(),
        }
    }

    pub fn job(self, name: &str, job: impl Job + 'static) -> Self {
        self.job_with(name, Resources::default(), job)
    }

    pub fn job_with(mut self, name: &str, resources: Resources, job: impl Job + 'static) -> Self {
        self.graph
            .add_job(name, resources, job)
            .expect("Failed to add job to graph");
        self
    }

    /// `child` runs after `parent`.
    pub fn edge(mut self, parent: &str, child: &str) -> Self {
        let p = self.id(parent);
        let c = self.id(child);
        self.graph
            .add_dependency(p, c)
            .expect("Failed to add dependency");
        self
    }

    pub fn build(self) -> JobGraph {
        self.graph
    }

    fn id(&self, name: &str) -> JobId {
        self.graph
            .find(name)
            .unwrap_or_else(|| panic!("unknown job '{name}' in test graph"))
    }
}

impl Default for JobGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Run context for driving a `Scheduler` directly.
pub fn run_context(config: RunConfig) -> RunContext {
    run_context_with(config, Shutdown::never())
}

pub fn run_context_with(config: RunConfig, shutdown: Shutdown) -> RunContext {
    let backend = config.backend.unwrap_or(Backend::DirectProcess);
    let config = Arc::new(config);
    let runner = CommandRunner::new(Arc::clone(&config), shutdown);
    RunContext::new(config, MasterLog::new(), runner, backend)
}

/// Shorthand for a resource request in tests.
pub fn resources(cores: u32, gib: u64) -> Resources {
    Resources::new(cores, MemorySize::gib(gib)).expect("valid test resources")
}
