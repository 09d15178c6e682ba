// src/graph/scheduler.rs

//! Per-run state machine.
//!
//! Pure and synchronous: the async runner feeds it completions and gets back
//! the tasks that became ready. It never touches tokio, so it can be stepped
//! by hand in tests.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::errors::Result;
use crate::graph::registry::TaskGraph;
use crate::graph::report::RunSummary;
use crate::graph::TaskName;

/// Per-run state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Waiting on prerequisites.
    Pending,
    /// Action started, completion not yet observed.
    Running,
    Succeeded,
    Failed,
    /// Never started because the run was aborted.
    Skipped,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Succeeded | RunState::Failed | RunState::Skipped
        )
    }
}

/// Outcome reported for a finished action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed,
}

/// Result of feeding one completion into the scheduler.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready and were marked `Running`.
    pub newly_ready: Vec<TaskName>,
    /// Tasks that will never start because this step aborted the run.
    pub newly_skipped: Vec<TaskName>,
    /// Whether every task of the run is now terminal.
    pub finished: bool,
}

/// Scheduler for a single run of one root task.
#[derive(Debug)]
pub struct Scheduler {
    root: TaskName,
    /// Effective waits of each task: its prerequisites plus the
    /// `runs_after` names that are part of this run.
    waits_on: BTreeMap<TaskName, Vec<TaskName>>,
    states: BTreeMap<TaskName, RunState>,
    completed: Vec<TaskName>,
    failed: Vec<TaskName>,
    aborted: bool,
}

impl Scheduler {
    /// Plan a run of `root` over `graph`.
    ///
    /// Fails with a configuration error (unknown root, unresolved
    /// prerequisite) before anything is marked running.
    pub fn for_run(graph: &TaskGraph, root: &str) -> Result<Self> {
        let closure = graph.closure(root)?;

        let mut waits_on = BTreeMap::new();
        let mut states = BTreeMap::new();

        for name in &closure {
            let Some(task) = graph.get(name) else {
                continue;
            };
            let mut waits: Vec<TaskName> = task.prerequisites().to_vec();
            for after in task.ordering() {
                if closure.contains(after) && !waits.contains(after) {
                    waits.push(after.clone());
                }
            }
            waits_on.insert(name.clone(), waits);
            states.insert(name.clone(), RunState::Pending);
        }

        Ok(Self {
            root: root.to_string(),
            waits_on,
            states,
            completed: Vec::new(),
            failed: Vec::new(),
            aborted: false,
        })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Number of tasks participating in this run.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state_of(&self, task: &str) -> Option<RunState> {
        self.states.get(task).copied()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(|s| s.as_str())
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// True once no task is pending or running.
    pub fn is_finished(&self) -> bool {
        self.states.values().all(|s| s.is_terminal())
    }

    /// Mark the initially ready tasks as running and return them.
    pub fn start(&mut self) -> Vec<TaskName> {
        self.collect_ready()
    }

    /// Record the outcome of a running task.
    pub fn complete(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        match self.states.get_mut(task) {
            Some(state) if *state == RunState::Running => {
                *state = match outcome {
                    TaskOutcome::Success => RunState::Succeeded,
                    TaskOutcome::Failed => RunState::Failed,
                };
            }
            Some(state) => {
                warn!(task = %task, state = ?state, "completion for a task that is not running; ignoring");
                return SchedulerStep {
                    finished: self.is_finished(),
                    ..SchedulerStep::default()
                };
            }
            None => {
                warn!(task = %task, "completion for a task outside this run; ignoring");
                return SchedulerStep {
                    finished: self.is_finished(),
                    ..SchedulerStep::default()
                };
            }
        }

        let mut step = SchedulerStep::default();

        match outcome {
            TaskOutcome::Success => {
                self.completed.push(task.to_string());
                if !self.aborted {
                    step.newly_ready = self.collect_ready();
                }
            }
            TaskOutcome::Failed => {
                self.failed.push(task.to_string());
                if !self.aborted {
                    self.aborted = true;
                    step.newly_skipped = self.skip_pending();
                }
            }
        }

        step.finished = self.is_finished();
        step
    }

    /// Snapshot of the run for reporting.
    pub fn summary(&self) -> RunSummary {
        let skipped = self
            .states
            .iter()
            .filter(|(_, s)| **s == RunState::Skipped)
            .map(|(n, _)| n.clone())
            .collect();

        RunSummary {
            root: self.root.clone(),
            completed: self.completed.clone(),
            failed: self.failed.clone(),
            skipped,
        }
    }

    /// Topological layers of the run, assuming every task succeeds.
    pub fn levels(&self) -> Vec<Vec<TaskName>> {
        let mut done: BTreeSet<&str> = BTreeSet::new();
        let mut levels = Vec::new();

        while done.len() < self.waits_on.len() {
            let level: Vec<TaskName> = self
                .waits_on
                .iter()
                .filter(|(name, _)| !done.contains(name.as_str()))
                .filter(|(_, waits)| waits.iter().all(|w| done.contains(w.as_str())))
                .map(|(name, _)| name.clone())
                .collect();

            if level.is_empty() {
                // Unreachable for an acyclic registry.
                break;
            }
            for name in &level {
                if let Some((key, _)) = self.waits_on.get_key_value(name) {
                    done.insert(key.as_str());
                }
            }
            levels.push(level);
        }

        levels
    }

    fn collect_ready(&mut self) -> Vec<TaskName> {
        let ready: Vec<TaskName> = self
            .states
            .iter()
            .filter(|(_, state)| **state == RunState::Pending)
            .filter(|(name, _)| {
                self.waits_on
                    .get(*name)
                    .map(|waits| {
                        waits
                            .iter()
                            .all(|w| self.states.get(w) == Some(&RunState::Succeeded))
                    })
                    .unwrap_or(false)
            })
            .map(|(name, _)| name.clone())
            .collect();

        for name in &ready {
            if let Some(state) = self.states.get_mut(name) {
                *state = RunState::Running;
            }
            debug!(task = %name, "prerequisites satisfied; marking Running");
        }

        ready
    }

    fn skip_pending(&mut self) -> Vec<TaskName> {
        let mut skipped = Vec::new();
        for (name, state) in self.states.iter_mut() {
            if *state == RunState::Pending {
                *state = RunState::Skipped;
                skipped.push(name.clone());
            }
        }
        if !skipped.is_empty() {
            debug!(?skipped, "run aborted; pending tasks will not start");
        }
        skipped
    }
}
