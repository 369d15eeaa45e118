// src/config/validate.rs

use std::collections::BTreeMap;

use crate::config::model::{ConfigFile, RunConfig};
use crate::errors::{JobdagError, Result};
use crate::types::{MemorySize, Resources};

impl TryFrom<ConfigFile> for RunConfig {
    type Error = crate::errors::JobdagError;

    fn try_from(file: ConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&file)?;
        let jobs = resolve_job_resources(&file)?;
        Ok(RunConfig::new_unchecked(file, jobs))
    }
}

/// Check the invariants a [`ConfigFile`] must satisfy before it is resolved.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    validate_run_section(cfg)?;
    validate_pipeline_section(cfg)?;
    Ok(())
}

fn validate_run_section(cfg: &ConfigFile) -> Result<()> {
    let run = &cfg.run;

    if run.max_cores == Some(0) {
        return Err(JobdagError::ConfigError(
            "[run].max_cores must be >= 1 (got 0)".to_string(),
        ));
    }

    if run.max_workers == Some(0) {
        return Err(JobdagError::ConfigError(
            "[run].max_workers must be >= 1 (got 0)".to_string(),
        ));
    }

    for (key, value) in [("image", &run.image), ("sandbox_image", &run.sandbox_image)] {
        if matches!(value, Some(v) if v.trim().is_empty()) {
            return Err(JobdagError::ConfigError(format!(
                "[run].{key} must not be empty"
            )));
        }
    }

    for volume in &run.volumes {
        let mut parts = volume.splitn(2, ':');
        let host = parts.next().unwrap_or_default();
        let container = parts.next().unwrap_or_default();
        if host.is_empty() || container.is_empty() {
            return Err(JobdagError::ConfigError(format!(
                "volume '{volume}' must have the form HOST:CONTAINER"
            )));
        }
    }

    Ok(())
}

fn validate_pipeline_section(cfg: &ConfigFile) -> Result<()> {
    if cfg.pipeline.total == 0 {
        return Err(JobdagError::ConfigError(
            "[pipeline].total must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn resolve_job_resources(cfg: &ConfigFile) -> Result<BTreeMap<String, Resources>> {
    let defaults = Resources::default();
    let mut jobs = BTreeMap::new();

    for (name, section) in cfg.jobs.iter() {
        let cores = section.cores.unwrap_or(defaults.cores);
        let memory: MemorySize = section.memory.unwrap_or(defaults.memory);
        let resources = Resources::new(cores, memory).map_err(|e| {
            JobdagError::ConfigError(format!("[jobs.{name}]: {e}"))
        })?;
        jobs.insert(name.clone(), resources);
    }

    Ok(jobs)
}
