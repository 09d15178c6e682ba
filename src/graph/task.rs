// src/graph/task.rs

//! Task definitions: a name, its edges, and an asynchronous action.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::errors::Result;
use crate::graph::registry::TaskGraph;
use crate::graph::TaskName;
use crate::services::Services;
use crate::types::BoxFuture;

/// Completion signal of a task action.
pub type ActionFuture = BoxFuture<'static, Result<()>>;

/// What an action gets to see when it is invoked.
///
/// `graph` lets long-lived actions (the watcher) trigger further runs;
/// `services` is where they park background listeners.
#[derive(Clone)]
pub struct TaskContext {
    pub task: TaskName,
    pub graph: Arc<TaskGraph>,
    pub services: Services,
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}

/// The unit of work behind a task.
///
/// Implemented for any `Fn(TaskContext) -> impl Future<Output = Result<()>>`,
/// so most tasks are registered with a closure.
pub trait TaskAction: Send + Sync {
    fn invoke(&self, ctx: TaskContext) -> ActionFuture;
}

impl<F, Fut> TaskAction for F
where
    F: Fn(TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn invoke(&self, ctx: TaskContext) -> ActionFuture {
        Box::pin(self(ctx))
    }
}

/// A named node of the task graph.
///
/// - `prerequisites` must all succeed before the action starts, and are
///   pulled into every run that includes this task.
/// - `runs_after` only orders: it applies when the named task happens to be
///   part of the same run, and never pulls it in.
/// - A task without an action is a pure grouping node (`start`, `deploy`).
#[derive(Clone)]
pub struct Task {
    pub(crate) name: TaskName,
    pub(crate) prerequisites: Vec<TaskName>,
    pub(crate) runs_after: Vec<TaskName>,
    pub(crate) description: Option<String>,
    pub(crate) action: Option<Arc<dyn TaskAction>>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("prerequisites", &self.prerequisites)
            .field("runs_after", &self.runs_after)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

impl Task {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            prerequisites: Vec::new(),
            runs_after: Vec::new(),
            description: None,
            action: None,
        }
    }

    pub fn depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.prerequisites.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn runs_after<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.runs_after.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn action<A: TaskAction + 'static>(mut self, action: A) -> Self {
        self.action = Some(Arc::new(action));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prerequisites(&self) -> &[TaskName] {
        &self.prerequisites
    }

    pub fn ordering(&self) -> &[TaskName] {
        &self.runs_after
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    /// Start the action, or resolve immediately for grouping nodes.
    pub(crate) fn start(&self, ctx: TaskContext) -> ActionFuture {
        match &self.action {
            Some(action) => action.invoke(ctx),
            None => Box::pin(async { Ok(()) }),
        }
    }
}
