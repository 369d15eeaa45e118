// src/exec/mod.rs

//! Command execution layer.
//!
//! This module is responsible for actually running the external commands
//! jobs ask for, using `tokio::process::Command`.
//!
//! - [`command`] holds `CommandSpec`, the per-backend invocation builder and
//!   the `CommandRunner` that spawns, waits and captures output.
//! - [`backend`] provides `BackendSelector`, which picks docker, singularity
//!   or a plain process once per run, and the `BackendProbe` seam tests use
//!   to fake availability.

pub mod backend;
pub mod command;

pub use backend::{BackendProbe, BackendSelector, PathProbe};
pub use command::{invocation, CommandRunner, CommandSpec, ExecutionFailure, ExecutionResult};
