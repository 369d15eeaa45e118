// src/exec/backend.rs

//! Backend selection.
//!
//! [`BackendSelector`] decides once per run which runtime commands use. The
//! availability check sits behind [`BackendProbe`] so tests can pretend an
//! engine is (or is not) installed without touching `PATH`.

use std::path::Path;
use std::sync::OnceLock;

use tracing::{debug, info};

use crate::config::RunConfig;
use crate::errors::{JobdagError, Result};
use crate::types::Backend;

/// Answers "can this executable be launched?".
pub trait BackendProbe: Send + Sync {
    fn is_available(&self, executable: &str) -> bool;
}

/// Production probe: looks the executable up on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathProbe;

impl BackendProbe for PathProbe {
    fn is_available(&self, executable: &str) -> bool {
        let Some(paths) = std::env::var_os("PATH") else {
            return false;
        };
        std::env::split_paths(&paths).any(|dir| is_executable(&dir.join(executable)))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

/// Resolves and caches the run's [`Backend`].
pub struct BackendSelector {
    probe: Box<dyn BackendProbe>,
    resolved: OnceLock<Backend>,
}

impl std::fmt::Debug for BackendSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSelector")
            .field("resolved", &self.resolved.get())
            .finish_non_exhaustive()
    }
}

impl Default for BackendSelector {
    fn default() -> Self {
        Self::new(PathProbe)
    }
}

impl BackendSelector {
    pub fn new(probe: impl BackendProbe + 'static) -> Self {
        Self {
            probe: Box::new(probe),
            resolved: OnceLock::new(),
        }
    }

    /// Decide which backend this run uses.
    ///
    /// - An explicitly configured backend is honoured, or rejected with
    ///   `BackendUnavailable`; there is no silent fallback.
    /// - Otherwise docker, then singularity, then a plain process, taking
    ///   the first one that is installed and configured.
    ///
    /// The first successful answer is cached; later calls return it without
    /// probing again.
    pub fn resolve(&self, config: &RunConfig) -> Result<Backend> {
        if let Some(backend) = self.resolved.get() {
            return Ok(*backend);
        }

        let backend = match config.backend {
            Some(explicit) => {
                self.check(explicit, config)
                    .map_err(|reason| JobdagError::BackendUnavailable {
                        backend: explicit,
                        reason,
                    })?;
                explicit
            }
            None => self.probe_in_order(config),
        };

        let backend = *self.resolved.get_or_init(|| backend);
        info!(backend = %backend, "resolved execution backend");
        Ok(backend)
    }

    fn probe_in_order(&self, config: &RunConfig) -> Backend {
        for candidate in Backend::PRIORITY {
            match self.check(candidate, config) {
                Ok(()) => return candidate,
                Err(reason) => debug!(backend = %candidate, %reason, "skipping backend"),
            }
        }
        Backend::DirectProcess
    }

    /// `Ok(())` if `backend` can be used with `config`, else why not.
    fn check(&self, backend: Backend, config: &RunConfig) -> std::result::Result<(), String> {
        let image = match backend {
            Backend::DirectProcess => return Ok(()),
            Backend::ImageRuntime => &config.image,
            Backend::SandboxRuntime => &config.sandbox_image,
        };

        if image.is_none() {
            return Err("no image configured".to_string());
        }

        match backend.executable() {
            Some(exe) if !self.probe.is_available(exe) => {
                Err(format!("`{exe}` not found on PATH"))
            }
            _ => Ok(()),
        }
    }
}
