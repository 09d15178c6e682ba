use std::io::Write as _;
use std::path::Path;

use sitepipe::config::{load_and_validate, parse_and_validate};
use sitepipe::errors::BuildError;
use sitepipe::types::OutputStyle;

fn config_error(toml: &str) -> String {
    match parse_and_validate(toml) {
        Err(BuildError::Config(msg)) => msg,
        Err(other) => panic!("expected a config error, got {other:?}"),
        Ok(_) => panic!("expected a config error for:\n{toml}"),
    }
}

#[test]
fn empty_file_yields_stock_defaults() {
    let cfg = parse_and_validate("").unwrap();

    assert_eq!(cfg.build.output, "build");
    assert_eq!(cfg.styles.entry, "src/scss/main.scss");
    assert_eq!(cfg.styles.output_style, OutputStyle::Compressed);
    assert_eq!(cfg.scripts.target_preset, "env");
    assert_eq!(cfg.watch.debounce_ms, 100);
    assert_eq!(cfg.server_root(), "build");

    let copies: Vec<&str> = cfg.copy.keys().map(String::as_str).collect();
    assert_eq!(
        copies,
        vec!["assets", "bootstrap-js", "favicon", "font-awesome", "html", "jquery"]
    );
    assert!(cfg.lint.scss.sources.iter().any(|s| s == "!src/scss/vendor/**/*.scss"));
}

#[test]
fn copy_entries_merge_over_defaults() {
    let cfg = parse_and_validate(
        r#"
[copy.jquery]
sources = ["x"]
dest = "y"
enabled = false

[copy.robots]
sources = ["static/robots.txt"]
"#,
    )
    .unwrap();

    assert!(!cfg.copy.contains_key("jquery"));
    assert_eq!(cfg.copy["robots"].dest, "");
    assert_eq!(cfg.output_path(&cfg.copy["robots"].dest), Path::new("build"));
    assert!(cfg.copy.contains_key("html"));
}

#[test]
fn copy_task_may_not_shadow_builtin() {
    let msg = config_error(
        r#"
[copy.styles]
sources = ["a.css"]
dest = "build"
"#,
    );
    assert!(msg.contains("styles"), "{msg}");
}

#[test]
fn zero_debounce_is_rejected() {
    let msg = config_error("[watch]\ndebounce_ms = 0\n");
    assert!(msg.contains("debounce_ms"), "{msg}");
}

#[test]
fn watch_binding_must_target_rebuildable_task() {
    let msg = config_error(
        r#"
[[watch.binding]]
pattern = "src/**/*.html"
task = "deploy"
"#,
    );
    assert!(msg.contains("deploy"), "{msg}");

    parse_and_validate(
        r#"
[[watch.binding]]
pattern = "src/**/*.scss"
task = "scss-lint"
"#,
    )
    .unwrap();
}

#[test]
fn unknown_lint_rule_cannot_be_disabled() {
    let err = parse_and_validate("[lint.scss]\ndisable = [\"no-such-rule\"]\n").unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("no-such-rule"), "{err}");
}

#[test]
fn selection_needs_an_including_pattern() {
    let msg = config_error("[scripts]\nsources = [\"!src/**/*.js\"]\n");
    assert!(msg.contains("[scripts].sources"), "{msg}");
}

#[test]
fn server_root_override_and_output_style() {
    let cfg = parse_and_validate(
        r#"
[build]
output = "dist"

[styles]
output_style = "expanded"

[server]
root = "public"
port = 8080
"#,
    )
    .unwrap();
    assert_eq!(cfg.server_root(), "public");
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.styles.output_style, OutputStyle::Expanded);
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let err = parse_and_validate("[build\noutput = 1").unwrap_err();
    assert!(matches!(err, BuildError::Toml(_)), "{err:?}");
}

#[test]
fn loads_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[build]\noutput = \"public\"").unwrap();

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.build.output, "public");
}

#[test]
fn destinations_follow_the_output_directory() {
    let cfg = parse_and_validate("[build]\noutput = \"dist\"\n").unwrap();

    assert_eq!(cfg.server_root(), "dist");
    assert_eq!(cfg.output_path(&cfg.styles.dest), Path::new("dist/css"));
    assert_eq!(cfg.output_path(&cfg.scripts.dest), Path::new("dist"));
    assert_eq!(cfg.output_path(&cfg.copy["html"].dest), Path::new("dist"));
    assert_eq!(
        cfg.output_path(&cfg.copy["font-awesome"].dest),
        Path::new("dist/fonts")
    );
}

#[test]
fn disabling_a_watched_copy_task_drops_its_stock_binding() {
    let cfg = parse_and_validate(
        r#"
[copy.html]
sources = ["src/**/*.html"]
enabled = false
"#,
    )
    .unwrap();

    assert!(!cfg.copy.contains_key("html"));
    let targets: Vec<&str> = cfg.watch.binding.iter().map(|b| b.task.as_str()).collect();
    assert_eq!(targets, vec!["styles", "js", "assets"]);
}

#[test]
fn user_binding_to_a_disabled_task_is_still_rejected() {
    let msg = config_error(
        r#"
[copy.assets]
sources = ["assets/**/*.png"]
enabled = false

[[watch.binding]]
pattern = "assets/**/*.png"
task = "assets"
"#,
    );
    assert!(msg.contains("'assets'"), "{msg}");
}

#[test]
fn user_bindings_replace_the_stock_ones() {
    let cfg = parse_and_validate(
        r#"
[[watch.binding]]
pattern = "src/**/*.html"
task = "html"
"#,
    )
    .unwrap();
    assert_eq!(cfg.watch.binding.len(), 1);
}
