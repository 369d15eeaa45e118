// src/exec/command.rs

//! Single-command execution across backends.

use std::fmt;
use std::process::Stdio;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::engine::Shutdown;
use crate::errors::{JobdagError, Result};
use crate::types::Backend;

/// A command line: program followed by its arguments. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            return Err(JobdagError::ConfigError(
                "command must contain at least a program name".to_string(),
            ));
        }
        Ok(Self { args })
    }

    pub fn program(&self) -> &str {
        &self.args[0]
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args.join(" "))
    }
}

/// Captured result of a successful command.
///
/// Both streams are kept exactly as the process wrote them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status: i32,
    pub backend: Backend,
}

impl ExecutionResult {
    /// Standard output as text, or `None` if it is not valid UTF-8.
    pub fn stdout_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.stdout).ok()
    }
}

/// A command exited non-zero, could not be launched, or was terminated.
#[derive(Debug, Clone, Error)]
#[error("{backend} command `{command}` failed: {reason}")]
pub struct ExecutionFailure {
    pub backend: Backend,
    pub command: CommandSpec,
    /// Exit status, if the process exited on its own.
    pub status: Option<i32>,
    /// Captured standard error. Decoded lossily; it is diagnostic only.
    pub stderr: String,
    pub reason: String,
}

impl ExecutionFailure {
    fn new(backend: Backend, command: &CommandSpec, reason: impl Into<String>) -> Self {
        Self {
            backend,
            command: command.clone(),
            status: None,
            stderr: String::new(),
            reason: reason.into(),
        }
    }
}

/// Build the argv that runs `command` under `backend`.
///
/// Container backends bind every configured volume plus the work directory
/// (mounted at the same path and used as the working directory).
pub fn invocation(
    command: &CommandSpec,
    backend: Backend,
    config: &RunConfig,
) -> std::result::Result<Vec<String>, String> {
    let mut argv: Vec<String> = Vec::new();

    match backend {
        Backend::DirectProcess => {}
        Backend::ImageRuntime => {
            let image = config
                .image
                .as_deref()
                .ok_or("no image configured for the docker backend")?;
            argv.extend(["docker", "run", "--rm"].map(String::from));
            for volume in &config.volumes {
                argv.push("-v".to_string());
                argv.push(volume.clone());
            }
            if let Some(dir) = &config.work_dir {
                let dir = dir.display().to_string();
                argv.push("-v".to_string());
                argv.push(format!("{dir}:{dir}"));
                argv.push("-w".to_string());
                argv.push(dir);
            }
            argv.push(image.to_string());
        }
        Backend::SandboxRuntime => {
            let image = config
                .sandbox_image
                .as_deref()
                .ok_or("no sandbox image configured for the singularity backend")?;
            argv.extend(["singularity", "exec"].map(String::from));
            for volume in &config.volumes {
                argv.push("--bind".to_string());
                argv.push(volume.clone());
            }
            if let Some(dir) = &config.work_dir {
                let dir = dir.display().to_string();
                argv.push("--bind".to_string());
                argv.push(format!("{dir}:{dir}"));
                argv.push("--pwd".to_string());
                argv.push(dir);
            }
            argv.push(image.to_string());
        }
    }

    argv.extend(command.args().iter().cloned());
    Ok(argv)
}

/// Runs commands for jobs. Clone freely; clones share configuration and the
/// shutdown signal.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    config: Arc<RunConfig>,
    shutdown: Shutdown,
}

impl CommandRunner {
    pub fn new(config: Arc<RunConfig>, shutdown: Shutdown) -> Self {
        Self { config, shutdown }
    }

    /// Run `command` under `backend`, block until it exits and capture both
    /// output streams.
    ///
    /// A non-zero exit is always an error. If shutdown is requested while the
    /// command runs, it gets the configured grace period and is then killed.
    pub async fn execute(
        &self,
        command: &CommandSpec,
        backend: Backend,
    ) -> std::result::Result<ExecutionResult, ExecutionFailure> {
        let argv = invocation(command, backend, &self.config)
            .map_err(|reason| ExecutionFailure::new(backend, command, reason))?;

        info!(backend = %backend, cmd = %command, "running command");
        debug!(?argv, "resolved invocation");

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            ExecutionFailure::new(backend, command, format!("failed to launch `{}`: {e}", argv[0]))
        })?;

        // Drain both pipes concurrently so a chatty process never blocks.
        let stdout = tokio::spawn(read_stream(child.stdout.take()));
        let stderr = tokio::spawn(read_stream(child.stderr.take()));

        let mut shutdown = self.shutdown.clone();
        let waited = tokio::select! {
            status = child.wait() => status,
            _ = shutdown.requested() => {
                warn!(
                    cmd = %command,
                    grace_secs = self.config.grace_period.as_secs_f64(),
                    "shutdown requested; waiting for command before killing it"
                );
                match tokio::time::timeout(self.config.grace_period, child.wait()).await {
                    Ok(status) => status,
                    Err(_) => {
                        if let Err(e) = child.kill().await {
                            warn!(cmd = %command, error = %e, "failed to kill command");
                        }
                        let mut failure =
                            ExecutionFailure::new(backend, command, "terminated by shutdown");
                        failure.stderr = lossy(collect(stderr).await);
                        return Err(failure);
                    }
                }
            }
        };

        let status = waited.map_err(|e| {
            ExecutionFailure::new(backend, command, format!("failed to wait for process: {e}"))
        })?;

        let stdout = collect(stdout).await;
        let stderr = collect(stderr).await;

        match status.code() {
            Some(0) => {
                debug!(cmd = %command, bytes = stdout.len(), "command succeeded");
                Ok(ExecutionResult {
                    stdout,
                    stderr,
                    status: 0,
                    backend,
                })
            }
            Some(code) => {
                warn!(cmd = %command, status = code, "command exited non-zero");
                Err(ExecutionFailure {
                    backend,
                    command: command.clone(),
                    status: Some(code),
                    stderr: lossy(stderr),
                    reason: format!("exited with status {code}"),
                })
            }
            None => Err(ExecutionFailure {
                backend,
                command: command.clone(),
                status: None,
                stderr: lossy(stderr),
                reason: "terminated by signal".to_string(),
            }),
        }
    }

    /// Like [`execute`](Self::execute), but return only the captured stdout
    /// as text.
    ///
    /// Output that is not valid UTF-8 is a failure rather than being
    /// rewritten; use [`execute`](Self::execute) for binary output.
    pub async fn execute_capture(
        &self,
        command: &CommandSpec,
        backend: Backend,
    ) -> std::result::Result<String, ExecutionFailure> {
        let result = self.execute(command, backend).await?;
        String::from_utf8(result.stdout).map_err(|e| ExecutionFailure {
            backend,
            command: command.clone(),
            status: Some(result.status),
            stderr: lossy(result.stderr),
            reason: format!("stdout is not valid UTF-8: {}", e.utf8_error()),
        })
    }
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        if let Err(e) = stream.read_to_end(&mut buf).await {
            debug!(error = %e, "error while reading command output");
        }
    }
    buf
}

async fn collect(handle: tokio::task::JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.await.unwrap_or_default()
}

fn lossy(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}
