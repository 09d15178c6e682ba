// src/graph/runner.rs

//! Async shell around [`Scheduler`]: spawns ready actions into a `JoinSet`
//! and feeds their completions back into the state machine.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::errors::{BuildError, Result};
use crate::graph::registry::TaskGraph;
use crate::graph::report::RunSummary;
use crate::graph::scheduler::{Scheduler, TaskOutcome};
use crate::graph::task::TaskContext;
use crate::graph::TaskName;
use crate::services::Services;

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(1);

type Joined = (TaskName, Result<()>);

/// Run `name` and its prerequisite closure.
///
/// Every task of the closure runs at most once. Independent tasks run
/// concurrently. After the first failure no new task is started; tasks that
/// are already running are awaited and their outcome is recorded, and the
/// first failure is returned as [`BuildError::TaskFailed`].
pub async fn run(graph: &Arc<TaskGraph>, name: &str, services: &Services) -> Result<RunSummary> {
    let run_id = NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed);
    let mut scheduler = Scheduler::for_run(graph, name)?;

    info!(run_id, task = %name, tasks = scheduler.len(), "starting run");
    let run_started = Instant::now();

    let mut set: JoinSet<Joined> = JoinSet::new();
    let mut started_at: HashMap<TaskName, Instant> = HashMap::new();
    let mut first_failure: Option<(TaskName, BuildError)> = None;

    let ready = scheduler.start();
    spawn_ready(&mut set, &mut started_at, graph, services, run_id, ready);

    while let Some(joined) = set.join_next().await {
        let (task, result) = match joined {
            Ok(done) => done,
            Err(err) => {
                error!(run_id, error = %err, "task wrapper did not complete");
                continue;
            }
        };

        let elapsed_ms = started_at
            .remove(&task)
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or_default();

        let outcome = match result {
            Ok(()) => {
                info!(run_id, task = %task, elapsed_ms, "task finished");
                TaskOutcome::Success
            }
            Err(err) => {
                if first_failure.is_none() {
                    error!(run_id, task = %task, elapsed_ms, error = %err, "task failed");
                    first_failure = Some((task.clone(), err));
                } else {
                    warn!(
                        run_id,
                        task = %task,
                        elapsed_ms,
                        error = %err,
                        "task failed after the run was already aborted"
                    );
                }
                TaskOutcome::Failed
            }
        };

        let step = scheduler.complete(&task, outcome);
        if !step.newly_skipped.is_empty() {
            info!(run_id, skipped = ?step.newly_skipped, "fail-fast: not starting remaining tasks");
        }
        spawn_ready(
            &mut set,
            &mut started_at,
            graph,
            services,
            run_id,
            step.newly_ready,
        );
    }

    let summary = scheduler.summary();

    if let Some((task, source)) = first_failure {
        info!(run_id, %summary, "run aborted");
        return Err(BuildError::TaskFailed {
            task,
            source: Box::new(source),
            summary,
        });
    }

    if !scheduler.is_finished() {
        return Err(BuildError::Other(anyhow!(
            "run of '{name}' ended with unfinished tasks"
        )));
    }

    info!(
        run_id,
        task = %name,
        elapsed_ms = run_started.elapsed().as_millis() as u64,
        %summary,
        "run finished"
    );
    Ok(summary)
}

fn spawn_ready(
    set: &mut JoinSet<Joined>,
    started_at: &mut HashMap<TaskName, Instant>,
    graph: &Arc<TaskGraph>,
    services: &Services,
    run_id: u64,
    ready: Vec<TaskName>,
) {
    for name in ready {
        let Some(task) = graph.get(&name) else {
            // The scheduler only hands out names from the closure.
            continue;
        };

        let ctx = TaskContext {
            task: name.clone(),
            graph: Arc::clone(graph),
            services: services.clone(),
        };

        debug!(run_id, task = %name, has_action = task.has_action(), "starting task");
        started_at.insert(name.clone(), Instant::now());

        let action = task.start(ctx);
        set.spawn(async move {
            // Inner spawn so a panicking action is reported against its name.
            let result = match tokio::spawn(action).await {
                Ok(result) => result,
                Err(err) => Err(BuildError::Other(anyhow!("task '{name}' panicked: {err}"))),
            };
            (name, result)
        });
    }
}
