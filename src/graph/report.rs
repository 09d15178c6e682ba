// src/graph/report.rs

use std::fmt;

use crate::graph::TaskName;

/// Outcome of one run of the task graph.
///
/// `completed` and `failed` are in completion order; `skipped` lists the
/// tasks that never started because the run aborted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub root: TaskName,
    pub completed: Vec<TaskName>,
    pub failed: Vec<TaskName>,
    pub skipped: Vec<TaskName>,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    pub fn ran(&self, task: &str) -> bool {
        self.completed.iter().any(|t| t == task) || self.failed.iter().any(|t| t == task)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} completed, {} failed, {} skipped",
            self.root,
            self.completed.len(),
            self.failed.len(),
            self.skipped.len()
        )
    }
}
