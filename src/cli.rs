// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::ConfigFile;
use crate::types::{Backend, MemorySize};

/// Command-line arguments for `jobdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobdag",
    version,
    about = "Run a small DAG of jobs through docker, singularity or plain processes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to a config file (TOML). Flags override values from the file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Force a backend: docker, singularity or subprocess.
    #[arg(long, value_name = "BACKEND")]
    pub backend: Option<Backend>,

    /// Image used with the docker backend.
    #[arg(long, value_name = "IMAGE")]
    pub image: Option<String>,

    /// Image used with the singularity backend.
    #[arg(long, value_name = "IMAGE")]
    pub sandbox_image: Option<String>,

    /// Extra HOST:CONTAINER binding for container backends. Repeatable.
    #[arg(long = "volume", value_name = "HOST:CONTAINER")]
    pub volumes: Vec<String>,

    /// Working directory shared with containers.
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Directory for the master log and run report. Created if missing.
    #[arg(long, value_name = "DIR")]
    pub write_logs: Option<PathBuf>,

    /// Total cores jobs may use at once.
    #[arg(long, value_name = "N")]
    pub max_cores: Option<u32>,

    /// Total memory jobs may use at once (e.g. 8G).
    #[arg(long, value_name = "SIZE")]
    pub max_memory: Option<MemorySize>,

    /// A message to be echoed to the Universe.
    #[arg(long, value_name = "TEXT")]
    pub message: Option<String>,

    /// Total times the message should be printed.
    #[arg(long, value_name = "N")]
    pub total: Option<u32>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JOBDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve configuration and print the job graph without running it.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Layer flags given on the command line over `file`.
    pub fn apply_overrides(&self, file: &mut ConfigFile) {
        let run = &mut file.run;
        if let Some(backend) = self.backend {
            run.backend = Some(backend);
        }
        if let Some(image) = &self.image {
            run.image = Some(image.clone());
        }
        if let Some(image) = &self.sandbox_image {
            run.sandbox_image = Some(image.clone());
        }
        run.volumes.extend(self.volumes.iter().cloned());
        if let Some(dir) = &self.work_dir {
            run.work_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.write_logs {
            run.log_dir = Some(dir.clone());
        }
        if let Some(n) = self.max_cores {
            run.max_cores = Some(n);
        }
        if let Some(size) = self.max_memory {
            run.max_memory = Some(size);
        }

        if let Some(message) = &self.message {
            file.pipeline.message = message.clone();
        }
        if let Some(total) = self.total {
            file.pipeline.total = total;
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
