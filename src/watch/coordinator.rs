// src/watch/coordinator.rs

//! Watch coordinator.
//!
//! [`WatchCore`] is the synchronous state machine: per target task it is
//! either idle or dispatching, and a dispatching task remembers whether
//! another change arrived meanwhile. [`coordinate`] is the async shell that
//! batches incoming paths over the debounce window, asks the core what to
//! dispatch and runs it through a [`Dispatcher`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::errors::{BuildError, Result};
use crate::graph::{run, TaskGraph, TaskName};
use crate::services::Services;
use crate::types::BoxFuture;
use crate::watch::patterns::BindingSet;

/// State of one watched target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Idle,
    Dispatching { rerun_pending: bool },
}

/// Pure coordinator state, keyed by target task.
///
/// Several bindings naming the same task share one state, so a task never
/// has two watch-triggered runs in flight.
#[derive(Debug, Clone, Default)]
pub struct WatchCore {
    states: BTreeMap<TaskName, BindingState>,
}

impl WatchCore {
    pub fn new<I, S>(tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        Self {
            states: tasks
                .into_iter()
                .map(|t| (t.into(), BindingState::Idle))
                .collect(),
        }
    }

    pub fn state_of(&self, task: &str) -> Option<BindingState> {
        self.states.get(task).copied()
    }

    /// True when nothing is dispatching.
    pub fn is_idle(&self) -> bool {
        self.states.values().all(|s| *s == BindingState::Idle)
    }

    /// A debounced batch touched `tasks`. Returns the tasks to dispatch now.
    pub fn on_changes(&mut self, tasks: &BTreeSet<TaskName>) -> Vec<TaskName> {
        let mut dispatch = Vec::new();
        for task in tasks {
            let Some(state) = self.states.get_mut(task) else {
                warn!(task = %task, "change for a task without a watch binding; ignoring");
                continue;
            };
            match state {
                BindingState::Idle => {
                    *state = BindingState::Dispatching {
                        rerun_pending: false,
                    };
                    dispatch.push(task.clone());
                }
                BindingState::Dispatching { rerun_pending } => {
                    if !*rerun_pending {
                        debug!(task = %task, "change while dispatching; one rerun queued");
                    }
                    *rerun_pending = true;
                }
            }
        }
        dispatch
    }

    /// A dispatch of `task` finished (either way). Returns `Some(task)` when
    /// exactly one follow-up run must start.
    pub fn on_finished(&mut self, task: &str) -> Option<TaskName> {
        let state = self.states.get_mut(task)?;
        match *state {
            BindingState::Dispatching {
                rerun_pending: true,
            } => {
                *state = BindingState::Dispatching {
                    rerun_pending: false,
                };
                Some(task.to_string())
            }
            BindingState::Dispatching {
                rerun_pending: false,
            } => {
                *state = BindingState::Idle;
                None
            }
            BindingState::Idle => {
                warn!(task = %task, "finish reported for an idle watch target");
                None
            }
        }
    }
}

/// Runs a task on behalf of the watcher.
pub trait Dispatcher: Send + Sync + 'static {
    fn dispatch(&self, task: &str) -> BoxFuture<'static, Result<()>>;
}

/// Dispatches through the task runner, so a watch-triggered run honours the
/// task's prerequisites like any other run.
#[derive(Debug, Clone)]
pub struct GraphDispatcher {
    graph: Arc<TaskGraph>,
    services: Services,
}

impl GraphDispatcher {
    pub fn new(graph: Arc<TaskGraph>, services: Services) -> Self {
        Self { graph, services }
    }
}

impl Dispatcher for GraphDispatcher {
    fn dispatch(&self, task: &str) -> BoxFuture<'static, Result<()>> {
        let graph = Arc::clone(&self.graph);
        let services = self.services.clone();
        let task = task.to_string();
        Box::pin(async move { run(&graph, &task, &services).await.map(|_| ()) })
    }
}

/// Drive `core` from root-relative changed paths until `changes` closes.
///
/// Paths arriving within `debounce` of the first path of a batch are
/// handled together. After the channel closes, in-flight dispatches are
/// awaited but no follow-up run is started.
pub async fn coordinate(
    bindings: Arc<BindingSet>,
    dispatcher: Arc<dyn Dispatcher>,
    debounce: Duration,
    mut changes: mpsc::UnboundedReceiver<String>,
) {
    let mut core = WatchCore::new(bindings.tasks());
    let mut inflight: JoinSet<(TaskName, Result<()>)> = JoinSet::new();
    let mut pending: BTreeSet<TaskName> = BTreeSet::new();
    let mut deadline: Option<Instant> = None;

    info!(bindings = bindings.len(), debounce_ms = debounce.as_millis() as u64, "watch coordinator started");

    loop {
        let wake = deadline;
        let flush = async move {
            match wake {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            received = changes.recv() => {
                let Some(path) = received else {
                    break;
                };
                let tasks = bindings.tasks_for(&path);
                if tasks.is_empty() {
                    continue;
                }
                debug!(path = %path, ?tasks, "change matched watch bindings");
                pending.extend(tasks);
                deadline.get_or_insert_with(|| Instant::now() + debounce);
            }
            _ = flush => {
                deadline = None;
                let batch = std::mem::take(&mut pending);
                for task in core.on_changes(&batch) {
                    spawn_dispatch(&mut inflight, &dispatcher, task);
                }
            }
            Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
                let Some(task) = report(joined) else {
                    continue;
                };
                if let Some(again) = core.on_finished(&task) {
                    info!(task = %again, "changes arrived during the last run; running again");
                    spawn_dispatch(&mut inflight, &dispatcher, again);
                }
            }
        }
    }

    while let Some(joined) = inflight.join_next().await {
        if let Some(task) = report(joined) {
            core.on_finished(&task);
        }
    }
    debug!("watch coordinator stopped");
}

fn spawn_dispatch(
    inflight: &mut JoinSet<(TaskName, Result<()>)>,
    dispatcher: &Arc<dyn Dispatcher>,
    task: TaskName,
) {
    info!(task = %task, "change detected; re-running task");
    let fut = dispatcher.dispatch(&task);
    inflight.spawn(async move {
        let result = match tokio::spawn(fut).await {
            Ok(result) => result,
            Err(err) => Err(BuildError::Other(anyhow!("dispatch of '{task}' panicked: {err}"))),
        };
        (task, result)
    });
}

fn report(
    joined: std::result::Result<(TaskName, Result<()>), tokio::task::JoinError>,
) -> Option<TaskName> {
    match joined {
        Ok((task, Ok(()))) => {
            info!(task = %task, "watch-triggered run finished");
            Some(task)
        }
        Ok((task, Err(err))) => {
            error!(task = %task, error = %err, "watch-triggered run failed; still watching");
            Some(task)
        }
        Err(err) => {
            error!(error = %err, "watch dispatch did not complete");
            None
        }
    }
}
