// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::exec::ExecutionFailure;
use crate::types::Backend;

#[derive(Error, Debug)]
pub enum JobdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The configured runtime cannot be used. Fatal; no job runs.
    #[error("Backend unavailable: {backend} ({reason})")]
    BackendUnavailable { backend: Backend, reason: String },

    /// A command exited non-zero or could not be launched. Fails the owning
    /// job only.
    #[error(transparent)]
    ExecutionFailure(#[from] ExecutionFailure),

    /// Graph validation failed. Fatal; no job runs.
    #[error("Cycle detected in job graph: {0}")]
    CycleDetected(String),

    #[error("Invalid job graph: {0}")]
    InvalidGraph(String),

    #[error("Invalid resource request: {0}")]
    InvalidResources(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl JobdagError {
    /// Captured error output, when the error came from a command.
    pub fn captured_stderr(&self) -> Option<&str> {
        match self {
            JobdagError::ExecutionFailure(failure) => Some(failure.stderr.as_str()),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, JobdagError>;
