// src/graph/registry.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::errors::{BuildError, Result};
use crate::graph::scheduler::Scheduler;
use crate::graph::task::{Task, TaskAction};
use crate::graph::TaskName;

/// Registry of named tasks.
///
/// Built once at start-up, then frozen behind an `Arc` and handed to
/// [`crate::graph::run`]. Registration rejects duplicate names and any edge
/// that would close a cycle; prerequisites may name tasks registered later,
/// so unresolved names are only reported when a run is planned.
#[derive(Default)]
pub struct TaskGraph {
    tasks: BTreeMap<TaskName, Task>,
    /// Registration order, for listings.
    order: Vec<TaskName>,
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("tasks", &self.order)
            .finish()
    }
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` with hard prerequisites and an action.
    pub fn register<A>(
        &mut self,
        name: impl Into<TaskName>,
        prerequisites: &[&str],
        action: A,
    ) -> Result<()>
    where
        A: TaskAction + 'static,
    {
        let task = Task::new(name)
            .depends_on(prerequisites.iter().copied())
            .action(action);
        self.register_task(task)
    }

    /// Register a fully described task.
    pub fn register_task(&mut self, task: Task) -> Result<()> {
        if self.tasks.contains_key(&task.name) {
            return Err(BuildError::DuplicateTask(task.name));
        }

        if let Some(own) = task
            .prerequisites
            .iter()
            .chain(task.runs_after.iter())
            .find(|dep| **dep == task.name)
        {
            return Err(BuildError::Cycle {
                task: task.name.clone(),
                via: own.clone(),
            });
        }

        self.ensure_acyclic_with(&task)?;

        debug!(
            task = %task.name,
            prerequisites = ?task.prerequisites,
            runs_after = ?task.runs_after,
            "registered task"
        );
        self.order.push(task.name.clone());
        self.tasks.insert(task.name.clone(), task);
        Ok(())
    }

    /// Check that adding `candidate` keeps the graph acyclic.
    ///
    /// Edge direction is `dep -> task`; both prerequisite and ordering edges
    /// count, since either kind would deadlock a run. Edges to names that are
    /// not registered yet cannot be part of a cycle and are left out.
    fn ensure_acyclic_with(&self, candidate: &Task) -> Result<()> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        let all = self
            .tasks
            .values()
            .chain(std::iter::once(candidate));

        for task in all.clone() {
            graph.add_node(task.name.as_str());
        }

        for task in all {
            for dep in task.prerequisites.iter().chain(task.runs_after.iter()) {
                if graph.contains_node(dep.as_str()) {
                    graph.add_edge(dep.as_str(), task.name.as_str(), ());
                }
            }
        }

        match toposort(&graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(BuildError::Cycle {
                task: candidate.name.clone(),
                via: cycle.node_id().to_string(),
            }),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|name| self.tasks.get(name))
    }

    /// Transitive prerequisite closure of `root`, including `root` itself.
    ///
    /// Fails if `root` is unknown or any prerequisite on the way is not
    /// registered. Ordering edges are not followed.
    pub fn closure(&self, root: &str) -> Result<BTreeSet<TaskName>> {
        if !self.tasks.contains_key(root) {
            return Err(BuildError::UnknownTask(root.to_string()));
        }

        let mut seen: BTreeSet<TaskName> = BTreeSet::new();
        let mut stack = vec![root.to_string()];

        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let Some(task) = self.tasks.get(&name) else {
                continue;
            };
            for dep in &task.prerequisites {
                if !self.tasks.contains_key(dep) {
                    return Err(BuildError::UnresolvedPrerequisite {
                        task: name.clone(),
                        prerequisite: dep.clone(),
                    });
                }
                stack.push(dep.clone());
            }
        }

        Ok(seen)
    }

    /// Execution levels for a run of `root`: every task in level `n` only
    /// waits on tasks from earlier levels.
    pub fn plan(&self, root: &str) -> Result<Vec<Vec<TaskName>>> {
        Ok(Scheduler::for_run(self, root)?.levels())
    }
}
