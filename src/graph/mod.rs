// src/graph/mod.rs

//! Task graph: registration, per-run scheduling and the async runner.

mod registry;
mod report;
mod runner;
mod scheduler;
mod task;

/// Tasks are addressed by name everywhere.
pub type TaskName = String;

pub use registry::TaskGraph;
pub use report::RunSummary;
pub use runner::run;
pub use scheduler::{RunState, Scheduler, SchedulerStep, TaskOutcome};
pub use task::{ActionFuture, Task, TaskAction, TaskContext};
