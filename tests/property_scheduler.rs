use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;
use sitepipe::graph::{RunState, Scheduler, Task, TaskGraph, TaskOutcome};

// Acyclic by construction: task N may only depend on tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, deps)| {
                    if i == 0 {
                        return Vec::new();
                    }
                    let unique: BTreeSet<usize> = deps.into_iter().map(|d| d % i).collect();
                    unique.into_iter().collect()
                })
                .collect()
        })
    })
}

fn name(i: usize) -> String {
    format!("task_{i}")
}

fn build_graph(deps: &[Vec<usize>]) -> TaskGraph {
    let mut graph = TaskGraph::new();
    for (i, task_deps) in deps.iter().enumerate() {
        graph
            .register_task(Task::new(name(i)).depends_on(task_deps.iter().map(|d| name(*d))))
            .unwrap();
    }
    let all: Vec<String> = (0..deps.len()).map(name).collect();
    graph.register_task(Task::new("root").depends_on(all)).unwrap();
    graph
}

proptest! {
    #[test]
    fn every_task_starts_once_after_its_prerequisites(
        deps in dag_strategy(10),
        picks in proptest::collection::vec(any::<usize>(), 0..64),
    ) {
        let graph = build_graph(&deps);
        let mut scheduler = Scheduler::for_run(&graph, "root").unwrap();

        let mut running: Vec<String> = scheduler.start();
        let mut started: HashSet<String> = running.iter().cloned().collect();
        let mut done: HashSet<String> = HashSet::new();
        let mut picks = picks.into_iter();

        while !running.is_empty() {
            let idx = picks.next().unwrap_or(0) % running.len();
            let task = running.swap_remove(idx);

            if let Some(i) = task.strip_prefix("task_").and_then(|n| n.parse::<usize>().ok()) {
                for d in &deps[i] {
                    prop_assert!(done.contains(&name(*d)), "{task} ran before {}", name(*d));
                }
            }

            done.insert(task.clone());
            let step = scheduler.complete(&task, TaskOutcome::Success);
            for next in step.newly_ready {
                prop_assert!(started.insert(next.clone()), "{next} started twice");
                running.push(next);
            }
        }

        prop_assert!(scheduler.is_finished());
        prop_assert_eq!(done.len(), deps.len() + 1);
        prop_assert_eq!(scheduler.state_of("root"), Some(RunState::Succeeded));
    }

    #[test]
    fn a_failure_leaves_every_task_terminal(
        deps in dag_strategy(10),
        fail_at in any::<usize>(),
    ) {
        let graph = build_graph(&deps);
        let mut scheduler = Scheduler::for_run(&graph, "root").unwrap();
        let fail_task = name(fail_at % deps.len());

        let mut running: Vec<String> = scheduler.start();
        while let Some(task) = running.pop() {
            let outcome = if task == fail_task { TaskOutcome::Failed } else { TaskOutcome::Success };
            let step = scheduler.complete(&task, outcome);
            running.extend(step.newly_ready);
        }

        prop_assert!(scheduler.is_finished());
        let summary = scheduler.summary();
        prop_assert!(!summary.succeeded());
        prop_assert_eq!(summary.failed, vec![fail_task]);
        prop_assert!(summary.skipped.contains(&"root".to_string()));
    }
}
