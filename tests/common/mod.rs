#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sitepipe::errors::{BuildError, Result};
use sitepipe::graph::{Task, TaskContext};
use sitepipe::types::BoxFuture;

pub use sitepipe_test_utils::init_tracing;

/// Shared log of events written by test actions.
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn position(log: &Log, entry: &str) -> usize {
    entries(log)
        .iter()
        .position(|e| e == entry)
        .unwrap_or_else(|| panic!("'{entry}' not in log {:?}", entries(log)))
}

/// Action that logs `start:<task>`, sleeps, then logs `end:<task>`.
pub fn logging_action(
    log: &Log,
    delay: Duration,
) -> impl Fn(TaskContext) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |ctx: TaskContext| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            log.lock().unwrap().push(format!("start:{}", ctx.task));
            tokio::time::sleep(delay).await;
            log.lock().unwrap().push(format!("end:{}", ctx.task));
            Ok(())
        })
    }
}

/// Action that logs its start and then fails.
pub fn failing_action(
    log: &Log,
) -> impl Fn(TaskContext) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |ctx: TaskContext| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            log.lock().unwrap().push(format!("start:{}", ctx.task));
            Err(BuildError::Config(format!("{} exploded", ctx.task)))
        })
    }
}

pub fn logged(name: &str, log: &Log) -> Task {
    Task::new(name).action(logging_action(log, Duration::from_millis(10)))
}
