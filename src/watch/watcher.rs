// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::{EventKind, ModifyKind};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::services::BackgroundService;
use crate::watch::coordinator::{coordinate, Dispatcher};
use crate::watch::digest::ContentDigests;
use crate::watch::patterns::BindingSet;

/// Running watcher: the `notify` handle plus the forwarding and
/// coordinating tasks. Dropping or stopping it ends watching.
pub struct WatchHandle {
    root: PathBuf,
    watcher: Option<RecommendedWatcher>,
    tasks: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("root", &self.root)
            .field("active", &self.watcher.is_some())
            .finish()
    }
}

impl WatchHandle {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BackgroundService for WatchHandle {
    fn name(&self) -> &str {
        "watch"
    }

    fn stop(mut self: Box<Self>) {
        // Dropping the watcher closes the event channel, which winds down
        // the forwarding task and then the coordinator.
        self.watcher.take();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!(root = ?self.root, "file watcher stopped");
    }
}

/// Watch the binding directories below `root` and re-run bound tasks through
/// `dispatcher`.
///
/// Must be called from within a tokio runtime.
pub fn spawn_watch(
    root: impl Into<PathBuf>,
    bindings: BindingSet,
    dispatcher: Arc<dyn Dispatcher>,
    debounce: Duration,
) -> Result<WatchHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);
    let bindings = Arc::new(bindings);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("sitepipe: failed to forward file event: {err}");
                }
            }
            Err(err) => eprintln!("sitepipe: file watch error: {err}"),
        },
        Config::default(),
    )?;
    let mut watched = 0usize;
    for dir in bindings.watch_dirs() {
        let path = root.join(&dir.path);
        if !path.is_dir() {
            warn!(dir = ?path, "watched directory does not exist; skipping");
            continue;
        }
        let mode = if dir.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(&path, mode)?;
        debug!(dir = ?path, recursive = dir.recursive, "watching directory");
        watched += 1;
    }
    info!(root = ?root, bindings = bindings.len(), dirs = watched, "file watcher started");

    let (change_tx, change_rx) = mpsc::unbounded_channel::<String>();

    let forward_root = root.clone();
    let forward_bindings = Arc::clone(&bindings);
    let forward = tokio::spawn(async move {
        let mut digests = ContentDigests::new();

        while let Some(event) = event_rx.recv().await {
            if !is_content_event(&event.kind) {
                continue;
            }
            for path in &event.paths {
                let Some(rel) = relative_str(&forward_root, path) else {
                    warn!(path = ?path, root = ?forward_root, "event outside the watched root");
                    continue;
                };
                if !forward_bindings.matches_any(&rel) {
                    continue;
                }
                let contents = tokio::fs::read(path).await.ok();
                if !digests.observe(path, contents.as_deref()) {
                    continue;
                }
                debug!(path = %rel, kind = ?event.kind, "watched file changed");
                if change_tx.send(rel).is_err() {
                    return;
                }
            }
        }
        debug!("file event stream ended");
    });

    let coordinator = tokio::spawn(coordinate(bindings, dispatcher, debounce, change_rx));

    Ok(WatchHandle {
        root,
        watcher: Some(watcher),
        tasks: vec![forward, coordinator],
    })
}

fn is_content_event(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        EventKind::Any => true,
        EventKind::Access(_) | EventKind::Other => false,
    }
}

/// `path` relative to `root` with forward slashes.
///
/// Falls back to comparing canonical paths when the event path uses a
/// different prefix for the same directory (symlinked temp dirs on macOS).
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }
    let (root, path) = (root.canonicalize().ok()?, path.canonicalize().ok()?);
    let rel = path.strip_prefix(&root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}
