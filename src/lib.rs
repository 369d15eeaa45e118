// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod job;
pub mod logging;
pub mod types;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{default_config_path, load_or_default, RunConfig};
use crate::dag::RunReport;
use crate::engine::{listen_for_ctrl_c, RunController, Shutdown};
use crate::job::MasterLog;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading, CLI overrides and resolution
/// - log directory creation
/// - the run controller
/// - Ctrl-C handling
/// - writing the master log and report into the log directory
pub async fn run(args: CliArgs) -> Result<RunReport> {
    let config = resolve_config(&args)?;

    if let Some(dir) = &config.log_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating log directory {}", dir.display()))?;
    }

    let (trigger, shutdown) = Shutdown::channel();
    let controller = RunController::new(config).with_shutdown(shutdown);

    if args.dry_run {
        print_dry_run(&controller)?;
        return Ok(RunReport {
            jobs: Vec::new(),
            success: true,
            first_failure: None,
        });
    }

    listen_for_ctrl_c(trigger);

    let report = controller.execute().await?;

    if let Some(dir) = &controller.config().log_dir {
        write_run_logs(dir, controller.master_log(), &report)?;
    }

    print!("{report}");
    Ok(report)
}

/// Config file (explicit, or `jobdag.toml` if present) + CLI flags.
fn resolve_config(args: &CliArgs) -> Result<RunConfig> {
    let path: Option<PathBuf> = match &args.config {
        Some(p) => Some(p.clone()),
        None => Some(default_config_path()).filter(|p| p.is_file()),
    };

    let mut file = load_or_default(path.as_deref())?;
    args.apply_overrides(&mut file);

    let config = RunConfig::try_from(file)?;
    debug!(?config, "resolved run configuration");
    Ok(config)
}

fn write_run_logs(dir: &Path, log: &MasterLog, report: &RunReport) -> Result<()> {
    let log_path = dir.join("master.log");
    let mut out = fs::File::create(&log_path)
        .with_context(|| format!("creating {}", log_path.display()))?;
    for line in log.lines() {
        writeln!(out, "[{}] {}", line.job, line.message)?;
    }

    let report_path = dir.join("report.txt");
    fs::write(&report_path, report.to_string())
        .with_context(|| format!("writing {}", report_path.display()))?;

    info!(dir = %dir.display(), "wrote master log and run report");
    Ok(())
}

/// Simple dry-run output: print configuration and the job graph.
fn print_dry_run(controller: &RunController) -> Result<()> {
    let config = controller.config();
    let graph = controller.build_graph()?;

    println!("jobdag dry-run");
    match controller.backend() {
        Ok(backend) => println!("  backend = {backend}"),
        Err(e) => println!("  backend = <unavailable: {e}>"),
    }
    println!(
        "  budget = {} core(s), {}, {} worker(s)",
        config.max_cores, config.max_memory, config.max_workers
    );
    println!("  message = {:?}", config.message);
    println!();

    println!("jobs ({}):", graph.len());
    for id in graph.job_ids() {
        let node = &graph[id];
        println!("  - {} ({})", node.name, node.resources);
        let parents: Vec<&str> = graph.parents(id).iter().map(|p| graph.name(*p)).collect();
        if !parents.is_empty() {
            println!("      after: {parents:?}");
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
