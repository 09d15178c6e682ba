use std::sync::Arc;

use sitepipe::errors::BuildError;
use sitepipe::graph::run;
use sitepipe::services::Services;
use sitepipe::tasks::{build_graph, names};
use sitepipe::{describe_plan, describe_tasks};
use sitepipe_test_utils::builders::{ProjectDir, TEST_CONFIG};
use sitepipe_test_utils::fakes::fake_toolchain;
use sitepipe_test_utils::init_tracing;

const OUTPUTS: &[&str] = &[
    "build/index.html",
    "build/about/index.html",
    "build/css/main.css",
    "build/js/app.js",
    "build/js/bootstrap.bundle.min.js",
    "build/js/jquery.min.js",
    "build/assets/logo.png",
    "build/fonts/fa.woff2",
    "build/favicon.ico",
];

#[test]
fn stock_graph_registers_every_task() {
    let project = ProjectDir::site();
    let graph = build_graph(&project.project()).unwrap();

    for name in names::RESERVED {
        assert!(graph.contains(name), "missing {name}");
    }
    for copy in ["html", "bootstrap-js", "jquery", "assets", "font-awesome", "favicon"] {
        assert!(graph.contains(copy), "missing {copy}");
    }

    let deploy = graph.closure(names::DEPLOY).unwrap();
    assert!(!deploy.contains(names::SCSS_LINT));
    assert!(!deploy.contains(names::SERVER));
    assert!(!deploy.contains(names::WATCH));

    let start = graph.closure(names::START).unwrap();
    assert!(start.contains(names::JS_LINT));
    assert!(start.contains(names::SERVER));
    assert!(start.contains(names::WATCH));
}

#[test]
fn start_plan_puts_lint_first_and_services_last() {
    let project = ProjectDir::site();
    let graph = build_graph(&project.project()).unwrap();

    let levels = graph.plan(names::START).unwrap();
    assert_eq!(
        levels[0],
        vec![names::JS_LINT.to_string(), names::SCSS_LINT.to_string()]
    );
    assert!(levels[1].contains(&"html".to_string()));
    assert!(levels[1].contains(&names::STYLES.to_string()));
    assert_eq!(
        levels[2],
        vec![names::SERVER.to_string(), names::WATCH.to_string()]
    );
    assert_eq!(levels[3], vec![names::START.to_string()]);

    let text = describe_plan(&graph, names::START).unwrap();
    assert!(text.starts_with("sitepipe dry-run: start\n  1: js-lint, scss-lint\n"), "{text}");
}

#[test]
fn task_listing_includes_descriptions() {
    let project = ProjectDir::site();
    let graph = build_graph(&project.project()).unwrap();

    let listing = describe_tasks(&graph);
    assert!(listing.lines().any(|l| l.starts_with("html") && l.contains("Copy HTML pages")));
    assert!(listing.lines().any(|l| l.starts_with("deploy") && l.contains("[")));
}

#[tokio::test]
async fn deploy_builds_every_output() {
    init_tracing();
    let project = ProjectDir::site();
    let graph = Arc::new(build_graph(&project.project()).unwrap());
    let services = Services::new();

    let summary = run(&graph, names::DEPLOY, &services).await.unwrap();

    assert!(summary.succeeded());
    assert!(!summary.ran(names::SCSS_LINT));
    assert!(services.is_empty());
    for output in OUTPUTS {
        assert!(project.exists(output), "missing {output}");
    }
    assert_eq!(project.read("build/js/app.js"), "/* @babel/preset-env */const greeting = 1;");
}

#[tokio::test]
async fn deploy_skips_lint_even_with_violations() {
    let project = ProjectDir::site();
    project.write("src/js/debug.js", "debugger;\n");
    let graph = Arc::new(build_graph(&project.project()).unwrap());

    run(&graph, names::DEPLOY, &Services::new()).await.unwrap();
    assert!(project.exists("build/js/debug.js"));
}

#[tokio::test]
async fn start_with_lint_violation_writes_nothing() {
    init_tracing();
    let project = ProjectDir::site();
    project.write("src/scss/_theme.scss", ".theme {\n  color: red;\n}\n");
    let graph = Arc::new(build_graph(&project.project()).unwrap());
    let services = Services::new();

    let err = run(&graph, names::START, &services).await.unwrap_err();
    match &err {
        BuildError::TaskFailed { task, summary, .. } => {
            assert_eq!(task, names::SCSS_LINT);
            assert!(summary.skipped.contains(&"html".to_string()));
            assert!(summary.skipped.contains(&names::SERVER.to_string()));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(matches!(err.root_cause(), BuildError::Lint { count: 1, .. }));
    assert!(!project.exists("build"));
    assert!(services.is_empty());
}

#[tokio::test]
async fn start_builds_then_registers_server_and_watcher() {
    init_tracing();
    let project = ProjectDir::site();
    let graph = Arc::new(build_graph(&project.project()).unwrap());
    let services = Services::new();

    let summary = run(&graph, names::START, &services).await.unwrap();
    assert!(summary.succeeded());
    for output in OUTPUTS {
        assert!(project.exists(output), "missing {output}");
    }

    let mut running = services.names();
    running.sort();
    assert_eq!(running, vec!["server".to_string(), "watch".to_string()]);

    services.shutdown();
    assert!(services.is_empty());
}

#[tokio::test]
async fn missing_vendor_file_fails_its_copy_task() {
    let project = ProjectDir::site();
    std::fs::remove_file(project.path("node_modules/jquery/dist/jquery.min.js")).unwrap();
    let graph = Arc::new(build_graph(&project.project_with(TEST_CONFIG, fake_toolchain())).unwrap());

    let err = run(&graph, names::DEPLOY, &Services::new()).await.unwrap_err();
    match err {
        BuildError::TaskFailed { task, source, .. } => {
            assert_eq!(task, "jquery");
            assert!(matches!(*source, BuildError::MissingSource(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn deploy_writes_below_the_configured_output() {
    let project = ProjectDir::site();
    let toml = format!("{TEST_CONFIG}\n[build]\noutput = \"dist\"\n");
    let built = project.project_with(&toml, fake_toolchain());
    assert_eq!(built.serve_root(), project.path("dist"));
    let graph = Arc::new(build_graph(&built).unwrap());

    run(&graph, names::DEPLOY, &Services::new()).await.unwrap();

    for output in OUTPUTS {
        let moved = output.replacen("build/", "dist/", 1);
        assert!(project.exists(&moved), "missing {moved}");
    }
    assert!(!project.exists("build"));
}
