mod common;

use std::sync::Arc;
use std::time::Duration;

use sitepipe::errors::BuildError;
use sitepipe::graph::{run, Task, TaskGraph};
use sitepipe::services::Services;

use common::{entries, failing_action, init_tracing, logged, logging_action, new_log, position};

#[test]
fn duplicate_name_is_rejected() {
    let log = new_log();
    let mut graph = TaskGraph::new();
    graph.register_task(logged("html", &log)).unwrap();

    let err = graph.register_task(logged("html", &log)).unwrap_err();
    assert!(matches!(err, BuildError::DuplicateTask(ref name) if name == "html"));
    assert!(err.is_configuration());
    assert_eq!(graph.len(), 1);
}

#[test]
fn self_dependency_is_a_cycle() {
    let log = new_log();
    let mut graph = TaskGraph::new();
    let err = graph
        .register_task(logged("a", &log).depends_on(["a"]))
        .unwrap_err();
    assert!(matches!(err, BuildError::Cycle { .. }));
    assert!(graph.is_empty());
}

#[test]
fn indirect_cycle_is_rejected_at_registration() {
    let log = new_log();
    let mut graph = TaskGraph::new();
    graph.register_task(logged("a", &log).depends_on(["c"])).unwrap();
    graph.register_task(logged("b", &log).depends_on(["a"])).unwrap();

    let err = graph
        .register_task(logged("c", &log).depends_on(["b"]))
        .unwrap_err();
    assert!(matches!(err, BuildError::Cycle { ref task, .. } if task == "c"));
    assert!(!graph.contains("c"));
}

#[test]
fn ordering_edges_count_for_cycles() {
    let log = new_log();
    let mut graph = TaskGraph::new();
    graph.register_task(logged("a", &log).runs_after(["b"])).unwrap();

    let err = graph
        .register_task(logged("b", &log).depends_on(["a"]))
        .unwrap_err();
    assert!(matches!(err, BuildError::Cycle { .. }));
}

#[tokio::test]
async fn unresolved_prerequisite_fails_before_any_action() {
    init_tracing();
    let log = new_log();
    let mut graph = TaskGraph::new();
    graph.register_task(logged("html", &log)).unwrap();
    graph
        .register_task(Task::new("start").depends_on(["html", "missing"]))
        .unwrap();
    let graph = Arc::new(graph);

    let err = run(&graph, "start", &Services::new()).await.unwrap_err();
    match err {
        BuildError::UnresolvedPrerequisite { task, prerequisite } => {
            assert_eq!(task, "start");
            assert_eq!(prerequisite, "missing");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn unknown_task_is_reported() {
    let graph = Arc::new(TaskGraph::new());
    let err = run(&graph, "nope", &Services::new()).await.unwrap_err();
    assert!(matches!(err, BuildError::UnknownTask(ref name) if name == "nope"));
    assert!(err.is_configuration());
}

#[tokio::test]
async fn diamond_runs_shared_prerequisite_once() {
    init_tracing();
    let log = new_log();
    let mut graph = TaskGraph::new();
    graph.register_task(logged("base", &log)).unwrap();
    graph.register_task(logged("left", &log).depends_on(["base"])).unwrap();
    graph.register_task(logged("right", &log).depends_on(["base"])).unwrap();
    graph
        .register_task(logged("top", &log).depends_on(["left", "right"]))
        .unwrap();
    let graph = Arc::new(graph);

    let summary = run(&graph, "top", &Services::new()).await.unwrap();
    assert!(summary.succeeded());
    assert_eq!(summary.completed.len(), 4);

    let log_entries = entries(&log);
    assert_eq!(log_entries.iter().filter(|e| *e == "start:base").count(), 1);
    assert!(position(&log, "end:base") < position(&log, "start:left"));
    assert!(position(&log, "end:base") < position(&log, "start:right"));
    assert!(position(&log, "end:left") < position(&log, "start:top"));
    assert!(position(&log, "end:right") < position(&log, "start:top"));
}

#[tokio::test]
async fn independent_tasks_run_concurrently() {
    let log = new_log();
    let mut graph = TaskGraph::new();
    graph
        .register_task(Task::new("a").action(logging_action(&log, Duration::from_millis(100))))
        .unwrap();
    graph
        .register_task(Task::new("b").action(logging_action(&log, Duration::from_millis(100))))
        .unwrap();
    graph
        .register_task(Task::new("all").depends_on(["a", "b"]))
        .unwrap();
    let graph = Arc::new(graph);

    run(&graph, "all", &Services::new()).await.unwrap();

    // Both started before either finished.
    assert!(position(&log, "start:a") < position(&log, "end:b"));
    assert!(position(&log, "start:b") < position(&log, "end:a"));
}

#[tokio::test]
async fn failure_stops_new_starts_but_awaits_running_siblings() {
    init_tracing();
    let log = new_log();
    let mut graph = TaskGraph::new();
    graph
        .register_task(Task::new("broken").action(failing_action(&log)))
        .unwrap();
    graph
        .register_task(Task::new("slow").action(logging_action(&log, Duration::from_millis(100))))
        .unwrap();
    graph
        .register_task(logged("after-broken", &log).depends_on(["broken"]))
        .unwrap();
    graph
        .register_task(Task::new("all").depends_on(["after-broken", "slow"]))
        .unwrap();
    let graph = Arc::new(graph);

    let err = run(&graph, "all", &Services::new()).await.unwrap_err();
    match err {
        BuildError::TaskFailed {
            task,
            source,
            summary,
        } => {
            assert_eq!(task, "broken");
            assert!(matches!(*source, BuildError::Config(_)));
            assert_eq!(summary.failed, vec!["broken".to_string()]);
            assert!(summary.completed.contains(&"slow".to_string()));
            assert!(summary.skipped.contains(&"after-broken".to_string()));
            assert!(summary.skipped.contains(&"all".to_string()));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let log_entries = entries(&log);
    assert!(log_entries.contains(&"end:slow".to_string()));
    assert!(!log_entries.contains(&"start:after-broken".to_string()));
}

#[tokio::test]
async fn runs_after_orders_without_pulling_in() {
    let log = new_log();
    let mut graph = TaskGraph::new();
    graph.register_task(logged("lint", &log)).unwrap();
    graph.register_task(logged("html", &log).runs_after(["lint"])).unwrap();
    graph
        .register_task(Task::new("start").depends_on(["lint", "html"]))
        .unwrap();
    graph.register_task(Task::new("deploy").depends_on(["html"])).unwrap();
    let graph = Arc::new(graph);

    run(&graph, "start", &Services::new()).await.unwrap();
    assert!(position(&log, "end:lint") < position(&log, "start:html"));

    log.lock().unwrap().clear();
    let summary = run(&graph, "deploy", &Services::new()).await.unwrap();
    assert!(!summary.ran("lint"));
    assert_eq!(entries(&log), vec!["start:html".to_string(), "end:html".to_string()]);
}

#[test]
fn plan_groups_tasks_into_levels() {
    let log = new_log();
    let mut graph = TaskGraph::new();
    graph.register_task(logged("a", &log)).unwrap();
    graph.register_task(logged("b", &log)).unwrap();
    graph.register_task(logged("c", &log).depends_on(["a"])).unwrap();
    graph
        .register_task(Task::new("root").depends_on(["b", "c"]))
        .unwrap();

    let levels = graph.plan("root").unwrap();
    assert_eq!(
        levels,
        vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["c".to_string()],
            vec!["root".to_string()],
        ]
    );
}

#[test]
fn closure_follows_prerequisites_only() {
    let log = new_log();
    let mut graph = TaskGraph::new();
    graph.register_task(logged("lint", &log)).unwrap();
    graph.register_task(logged("html", &log).runs_after(["lint"])).unwrap();

    let closure = graph.closure("html").unwrap();
    assert_eq!(closure.into_iter().collect::<Vec<_>>(), vec!["html".to_string()]);
}
