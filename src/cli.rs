// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `sitepipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitepipe",
    version,
    about = "Build, lint, serve and watch a static site.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run.
    #[arg(value_name = "TASK", default_value = "start")]
    pub task: String,

    /// Path to the config file (TOML).
    ///
    /// Default: `Sitepipe.toml` in the current working directory, or built-in
    /// defaults when that file does not exist.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SITEPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the execution levels of TASK without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// List the registered tasks and exit.
    #[arg(long)]
    pub list: bool,

    /// Do not open a browser when the dev server starts.
    #[arg(long)]
    pub no_open: bool,

    /// Override `[server].port`.
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
