// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RunConfig};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `ConfigFile`.
///
/// This only performs TOML deserialization; it does **not** resolve or
/// validate anything. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: ConfigFile = toml::from_str(&contents)?;
    debug!(path = %path.display(), "loaded config file");

    Ok(config)
}

/// Load a config file if one was given, otherwise start from defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<ConfigFile> {
    match path {
        Some(p) => load_from_path(p),
        None => Ok(ConfigFile::default()),
    }
}

/// Load a configuration file from path and resolve it into a [`RunConfig`].
///
/// - Reads TOML.
/// - Applies defaults.
/// - Checks resource requests, worker bounds and volume syntax.
/// - Multiplies `message` by `total`.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<RunConfig> {
    let file = load_from_path(&path)?;
    RunConfig::try_from(file)
}

/// Default config file name looked up in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("jobdag.toml")
}
