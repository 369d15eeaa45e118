// src/job/mod.rs

//! Jobs: the units of work the scheduler runs.
//!
//! - [`context`] holds the `JobContext` a job runs with and the shared
//!   `MasterLog`.
//! - [`pipeline`] contains the two jobs of the stock pipeline.

pub mod context;
pub mod pipeline;

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;

pub use context::{JobContext, LogLine, MasterLog, RunContext};
pub use pipeline::{EchoMessage, Greeting, HELLO_WORLD};

/// Future returned by [`Job::run`].
pub type JobFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// A unit of work.
///
/// `run` is called at most once per run. It must not touch other jobs or the
/// graph; its only effects are commands run through `ctx` and lines logged
/// to the master log. Returning an error fails this job and skips its
/// descendants.
pub trait Job: Send + Sync {
    fn run<'a>(&'a self, ctx: &'a JobContext) -> JobFuture<'a>;
}
