// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{Backend, MemorySize, Resources};

/// Default `[pipeline].message`.
pub const DEFAULT_MESSAGE: &str = "hello Universe, this text is used in the pipeline tests";

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [run]
/// backend = "docker"
/// image = "ubuntu:22.04"
/// max_cores = 4
/// max_memory = "8G"
///
/// [pipeline]
/// message = "hi"
/// total = 3
///
/// [jobs.hello_message]
/// cores = 2
/// memory = "2G"
/// ```
///
/// All sections are optional. CLI flags are layered on top before the file
/// is resolved into a [`RunConfig`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    /// Execution environment from `[run]`.
    #[serde(default)]
    pub run: RunSection,

    /// Domain parameters from `[pipeline]`.
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// Per-job resource requests from `[jobs.<name>]`.
    #[serde(default)]
    pub jobs: BTreeMap<String, JobSection>,
}

/// `[run]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunSection {
    /// Explicit backend. If `None`, the backend is probed.
    #[serde(default)]
    pub backend: Option<Backend>,

    /// Image reference used by `docker`.
    #[serde(default)]
    pub image: Option<String>,

    /// Image used by `singularity`.
    #[serde(default)]
    pub sandbox_image: Option<String>,

    /// Extra `host:container` bindings for container backends.
    #[serde(default)]
    pub volumes: Vec<String>,

    /// Working directory shared with containers.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    /// Directory for the master log and run report.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default)]
    pub max_cores: Option<u32>,

    #[serde(default)]
    pub max_memory: Option<MemorySize>,

    /// Upper bound on concurrently running jobs. Defaults to `max_cores`.
    #[serde(default)]
    pub max_workers: Option<usize>,

    /// Seconds a running job may keep going after shutdown is requested.
    #[serde(default)]
    pub grace_period_secs: Option<u64>,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    /// A message to be echoed to the Universe.
    #[serde(default = "default_message")]
    pub message: String,

    /// How many times `message` is repeated before it reaches the jobs.
    #[serde(default = "default_total")]
    pub total: u32,
}

fn default_message() -> String {
    DEFAULT_MESSAGE.to_string()
}

fn default_total() -> u32 {
    1
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            message: default_message(),
            total: default_total(),
        }
    }
}

/// `[jobs.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobSection {
    #[serde(default)]
    pub cores: Option<u32>,

    #[serde(default)]
    pub memory: Option<MemorySize>,
}

/// Fully resolved, validated configuration for one run.
///
/// Built from a [`ConfigFile`] through `RunConfig::try_from`; immutable
/// afterwards and shared read-only between jobs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub backend: Option<Backend>,
    pub image: Option<String>,
    pub sandbox_image: Option<String>,
    pub volumes: Vec<String>,
    pub work_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub max_cores: u32,
    pub max_memory: MemorySize,
    pub max_workers: usize,
    pub grace_period: Duration,
    /// Message already repeated `total` times.
    pub message: String,
    pub total: u32,
    pub jobs: BTreeMap<String, Resources>,
}

impl RunConfig {
    /// Construct without validation. Prefer `RunConfig::try_from`.
    pub(crate) fn new_unchecked(file: ConfigFile, jobs: BTreeMap<String, Resources>) -> Self {
        let run = file.run;
        let max_cores = run.max_cores.unwrap_or_else(default_max_cores);
        Self {
            backend: run.backend,
            image: run.image,
            sandbox_image: run.sandbox_image,
            volumes: run.volumes,
            work_dir: run.work_dir,
            log_dir: run.log_dir,
            max_cores,
            max_memory: run.max_memory.unwrap_or_else(|| MemorySize::gib(8)),
            max_workers: run.max_workers.unwrap_or(max_cores as usize),
            grace_period: Duration::from_secs(run.grace_period_secs.unwrap_or(10)),
            message: file.pipeline.message.repeat(file.pipeline.total as usize),
            total: file.pipeline.total,
            jobs,
        }
    }

    /// Resource request for the named job, falling back to one core / 1G.
    pub fn resources_for(&self, job: &str) -> Resources {
        self.jobs.get(job).copied().unwrap_or_default()
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

fn default_max_cores() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
}
