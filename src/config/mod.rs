// src/config/mod.rs

//! Configuration loading and validation for jobdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model and the resolved `RunConfig` (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate and resolve it (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{ConfigFile, JobSection, PipelineSection, RunConfig, RunSection, DEFAULT_MESSAGE};
pub use validate::validate_config;
