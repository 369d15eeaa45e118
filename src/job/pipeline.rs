// src/job/pipeline.rs

//! Jobs of the stock two-step pipeline.

use tracing::debug;

use crate::job::{Job, JobContext, JobFuture};

/// Greeting logged by [`Greeting::default`].
pub const HELLO_WORLD: &str = "Hello World";

/// Logs a fixed message to the master log. Runs no command.
#[derive(Debug, Clone)]
pub struct Greeting {
    message: String,
}

impl Greeting {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for Greeting {
    fn default() -> Self {
        Self::new(HELLO_WORLD)
    }
}

impl Job for Greeting {
    fn run<'a>(&'a self, ctx: &'a JobContext) -> JobFuture<'a> {
        Box::pin(async move {
            ctx.log_to_master(self.message.clone());
            Ok(())
        })
    }
}

/// Echoes the configured message through the run's backend and logs what
/// came back.
#[derive(Debug, Clone, Default)]
pub struct EchoMessage;

impl Job for EchoMessage {
    fn run<'a>(&'a self, ctx: &'a JobContext) -> JobFuture<'a> {
        Box::pin(async move {
            let message = ctx.config().message.clone();
            let output = ctx.check_output(["echo".to_string(), message]).await?;
            debug!(job = %ctx.job_name(), bytes = output.len(), "captured echo output");
            ctx.log_to_master(output.trim_end_matches(['\r', '\n']));
            Ok(())
        })
    }
}
