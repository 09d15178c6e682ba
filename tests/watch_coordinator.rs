use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use sitepipe::config::WatchBindingConfig;
use sitepipe::watch::{
    coordinate, digest, relative_str, spawn_watch, Binding, BindingSet, BindingState,
    ContentDigests, Dispatcher, WatchCore, WatchDir,
};
use sitepipe::services::BackgroundService;
use sitepipe_test_utils::builders::ProjectDir;
use sitepipe_test_utils::fakes::RecordingDispatcher;
use sitepipe_test_utils::{init_tracing, with_timeout};

fn set(tasks: &[&str]) -> BTreeSet<String> {
    tasks.iter().map(|t| t.to_string()).collect()
}

fn bindings() -> BindingSet {
    BindingSet::new(vec![
        Binding::new("src/scss/**/*.scss", "styles").unwrap(),
        Binding::new("src/**/*.html", "html").unwrap(),
        Binding::new("src/**/*.js", "js").unwrap(),
    ])
}

#[test]
fn patterns_match_root_relative_paths() {
    let bindings = bindings();
    assert_eq!(bindings.tasks_for("src/scss/parts/_nav.scss"), set(&["styles"]));
    assert_eq!(bindings.tasks_for("src/index.html"), set(&["html"]));
    assert!(bindings.tasks_for("build/index.html").is_empty());
    assert!(!bindings.matches_any("README.md"));
    assert_eq!(bindings.tasks(), set(&["html", "js", "styles"]));
}

#[test]
fn bindings_from_config() {
    let set = BindingSet::from_config(&[WatchBindingConfig {
        pattern: "./assets/**/*.png".to_string(),
        task: "assets".to_string(),
    }])
    .unwrap();
    assert_eq!(set.len(), 1);
    assert!(set.matches_any("assets/img/logo.png"));
}

#[test]
fn core_coalesces_changes_during_a_run() {
    let mut core = WatchCore::new(["styles", "html"]);

    assert_eq!(core.on_changes(&set(&["styles"])), vec!["styles".to_string()]);
    assert_eq!(
        core.state_of("styles"),
        Some(BindingState::Dispatching { rerun_pending: false })
    );

    // Any number of changes while running collapse into one rerun.
    assert!(core.on_changes(&set(&["styles"])).is_empty());
    assert!(core.on_changes(&set(&["styles"])).is_empty());
    assert_eq!(
        core.state_of("styles"),
        Some(BindingState::Dispatching { rerun_pending: true })
    );

    assert_eq!(core.on_finished("styles"), Some("styles".to_string()));
    assert_eq!(core.on_finished("styles"), None);
    assert!(core.is_idle());
}

#[test]
fn core_tracks_targets_independently() {
    let mut core = WatchCore::new(["styles", "html"]);
    assert_eq!(
        core.on_changes(&set(&["styles", "html"])),
        vec!["html".to_string(), "styles".to_string()]
    );
    assert_eq!(core.on_finished("html"), None);
    assert_eq!(core.state_of("html"), Some(BindingState::Idle));
    assert!(!core.is_idle());
    assert!(core.on_changes(&set(&["unbound"])).is_empty());
}

#[tokio::test]
async fn burst_within_debounce_dispatches_once() {
    init_tracing();
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(coordinate(
        Arc::new(bindings()),
        Arc::clone(&dispatcher) as Arc<dyn Dispatcher>,
        Duration::from_millis(50),
        rx,
    ));

    tx.send("src/scss/a.scss".to_string()).unwrap();
    tx.send("src/scss/b.scss".to_string()).unwrap();
    tx.send("src/index.html".to_string()).unwrap();
    tx.send("notes.txt".to_string()).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    drop(tx);
    with_timeout(handle).await.unwrap();

    let mut dispatched = dispatcher.dispatched();
    dispatched.sort();
    assert_eq!(dispatched, vec!["html".to_string(), "styles".to_string()]);
}

#[tokio::test]
async fn changes_during_a_run_cause_exactly_one_rerun() {
    init_tracing();
    let dispatcher = Arc::new(RecordingDispatcher::with_delay(Duration::from_millis(300)));
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(coordinate(
        Arc::new(bindings()),
        Arc::clone(&dispatcher) as Arc<dyn Dispatcher>,
        Duration::from_millis(20),
        rx,
    ));

    tx.send("src/app.js".to_string()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(dispatcher.count("js"), 1);

    // Three separate batches while the first run is still going.
    for _ in 0..3 {
        tx.send("src/app.js".to_string()).unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
    }

    tokio::time::sleep(Duration::from_millis(800)).await;
    drop(tx);
    with_timeout(handle).await.unwrap();

    assert_eq!(dispatcher.count("js"), 2);
}

#[tokio::test]
async fn failed_dispatch_keeps_watching() {
    let dispatcher = Arc::new(RecordingDispatcher {
        failing: vec!["html".to_string()],
        ..RecordingDispatcher::default()
    });
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(coordinate(
        Arc::new(bindings()),
        Arc::clone(&dispatcher) as Arc<dyn Dispatcher>,
        Duration::from_millis(20),
        rx,
    ));

    tx.send("src/index.html".to_string()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send("src/index.html".to_string()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(tx);
    with_timeout(handle).await.unwrap();

    assert_eq!(dispatcher.count("html"), 2);
}

#[test]
fn digests_ignore_unchanged_content() {
    let mut digests = ContentDigests::new();
    let path = Path::new("src/index.html");

    assert!(digests.observe(path, Some(b"<h1>a</h1>")));
    assert!(!digests.observe(path, Some(b"<h1>a</h1>")));
    assert!(digests.observe(path, Some(b"<h1>b</h1>")));
    assert!(digests.observe(path, None));
    assert!(digests.is_empty());

    assert_eq!(digest(b"abc"), digest(b"abc"));
    assert_ne!(digest(b"abc"), digest(b"abd"));
}

#[test]
fn relative_paths_use_forward_slashes() {
    let root = Path::new("/project");
    assert_eq!(
        relative_str(root, Path::new("/project/src/scss/main.scss")),
        Some("src/scss/main.scss".to_string())
    );
    assert_eq!(relative_str(root, Path::new("/elsewhere/file")), None);
}

fn dir(path: &str, recursive: bool) -> WatchDir {
    WatchDir {
        path: PathBuf::from(path),
        recursive,
    }
}

#[test]
fn only_binding_bases_are_watched() {
    let mut entries = vec![
        Binding::new("src/scss/**/*.scss", "styles").unwrap(),
        Binding::new("src/**/*.html", "html").unwrap(),
        Binding::new("./assets/**/*.png", "assets").unwrap(),
    ];
    assert_eq!(
        BindingSet::new(entries.clone()).watch_dirs(),
        vec![dir("assets", true), dir("src", true)]
    );

    entries.push(Binding::new("favicon.ico", "favicon").unwrap());
    entries.push(Binding::new("src/robots.txt", "robots").unwrap());
    assert_eq!(
        BindingSet::new(entries).watch_dirs(),
        vec![dir("", false), dir("assets", true), dir("src", true)]
    );
}

#[tokio::test]
async fn editing_a_bound_file_dispatches_its_task() {
    init_tracing();
    let project = ProjectDir::new();
    project.write("src/index.html", "<h1>one</h1>");
    project.write("node_modules/pkg/index.js", "module.exports = 1;");

    let dispatcher = Arc::new(RecordingDispatcher::default());
    let handle = spawn_watch(
        project.root(),
        bindings(),
        Arc::clone(&dispatcher) as Arc<dyn Dispatcher>,
        Duration::from_millis(20),
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    project.write("node_modules/pkg/index.js", "module.exports = 2;");
    project.write("src/index.html", "<h1>two</h1>");

    with_timeout(async {
        while dispatcher.count("html") == 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;

    // A save can arrive as a truncate plus a write, so allow a rerun.
    assert!(dispatcher.dispatched().iter().all(|task| task == "html"));
    Box::new(handle).stop();
}
