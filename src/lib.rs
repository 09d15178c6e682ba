// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod graph;
pub mod lint;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod services;
pub mod tasks;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::load_or_default;
use crate::graph::TaskGraph;
use crate::services::Services;
use crate::tasks::{build_graph, Project};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - the task graph
/// - the run of the requested task
/// - keeping background services alive until Ctrl-C
pub async fn run(args: CliArgs) -> Result<()> {
    let explicit = args.config.as_deref().map(Path::new);
    let (mut cfg, config_path) = load_or_default(explicit)?;

    if args.no_open {
        cfg.server.open = false;
    }
    if let Some(port) = args.port {
        cfg.server.port = port;
    }

    let root = config_root_dir(&config_path);
    let project = Project::new(root, cfg);
    let graph = Arc::new(build_graph(&project)?);

    if args.list {
        print!("{}", describe_tasks(&graph));
        return Ok(());
    }

    if args.dry_run {
        print!("{}", describe_plan(&graph, &args.task)?);
        debug!("dry-run complete (no execution)");
        return Ok(());
    }

    let services = Services::new();
    let summary = match graph::run(&graph, &args.task, &services).await {
        Ok(summary) => summary,
        Err(err) => {
            services.shutdown();
            return Err(err.into());
        }
    };
    info!(%summary, "run finished");

    if services.is_empty() {
        return Ok(());
    }

    info!(services = ?services.names(), "running; press Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("failed to listen for Ctrl+C: {e}");
    }
    services.shutdown();
    Ok(())
}

/// Directory containing the config file, or `.`.
fn config_root_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// One line per task: name, description and prerequisites.
pub fn describe_tasks(graph: &TaskGraph) -> String {
    let mut out = String::new();
    let width = graph.tasks().map(|t| t.name().len()).max().unwrap_or(0);
    for task in graph.tasks() {
        let mut line = format!("{:<width$}  {}", task.name(), task.description().unwrap_or(""));
        if !task.prerequisites().is_empty() {
            line.push_str(&format!(" [{}]", task.prerequisites().join(", ")));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Execution levels of a run of `name`, without running anything.
pub fn describe_plan(graph: &TaskGraph, name: &str) -> errors::Result<String> {
    let levels = graph.plan(name)?;
    let mut out = format!("sitepipe dry-run: {name}\n");
    for (i, level) in levels.iter().enumerate() {
        out.push_str(&format!("  {}: {}\n", i + 1, level.join(", ")));
    }
    Ok(out)
}
