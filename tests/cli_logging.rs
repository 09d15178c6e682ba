use clap::Parser;

use sitepipe::cli::{CliArgs, LogLevel};
use sitepipe::logging::resolve_level;

#[test]
fn task_defaults_to_start() {
    let args = CliArgs::try_parse_from(["sitepipe"]).unwrap();
    assert_eq!(args.task, "start");
    assert!(args.config.is_none());
    assert!(!args.dry_run);
    assert!(!args.list);
}

#[test]
fn flags_are_parsed() {
    let args = CliArgs::try_parse_from([
        "sitepipe",
        "deploy",
        "--config",
        "site/Sitepipe.toml",
        "--log-level",
        "debug",
        "--dry-run",
        "--no-open",
        "--port",
        "8081",
    ])
    .unwrap();

    assert_eq!(args.task, "deploy");
    assert_eq!(args.config.as_deref(), Some("site/Sitepipe.toml"));
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    assert!(args.dry_run);
    assert!(args.no_open);
    assert_eq!(args.port, Some(8081));
}

#[test]
fn bad_port_is_rejected() {
    assert!(CliArgs::try_parse_from(["sitepipe", "--port", "70000"]).is_err());
}

#[test]
fn cli_flag_wins_over_environment() {
    assert_eq!(
        resolve_level(Some(LogLevel::Warn), Some("trace")),
        tracing::Level::WARN
    );
    assert_eq!(resolve_level(None, Some(" DEBUG ")), tracing::Level::DEBUG);
    assert_eq!(resolve_level(None, Some("warning")), tracing::Level::WARN);
    assert_eq!(resolve_level(None, Some("loud")), tracing::Level::INFO);
    assert_eq!(resolve_level(None, None), tracing::Level::INFO);
}
