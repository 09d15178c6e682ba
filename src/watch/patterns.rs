// src/watch/patterns.rs

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use anyhow::Context;
use globset::{GlobBuilder, GlobMatcher};

use crate::config::WatchBindingConfig;
use crate::errors::Result;
use crate::graph::TaskName;
use crate::pipeline::select::glob_base;

/// A directory the watcher subscribes to, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct WatchDir {
    pub path: PathBuf,
    pub recursive: bool,
}

/// One `pattern -> task` watch binding, compiled.
#[derive(Clone)]
pub struct Binding {
    pattern: String,
    task: TaskName,
    matcher: GlobMatcher,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("pattern", &self.pattern)
            .field("task", &self.task)
            .finish()
    }
}

impl Binding {
    pub fn new(pattern: impl Into<String>, task: impl Into<TaskName>) -> Result<Self> {
        let pattern = pattern.into();
        let task = task.into();
        let glob = GlobBuilder::new(pattern.trim_start_matches("./"))
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid watch pattern '{pattern}' for task {task}"))?;
        Ok(Self {
            matcher: glob.compile_matcher(),
            pattern,
            task,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    /// `rel_path` is relative to the project root, with forward slashes.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }

    /// Smallest directory that can hold every match: the glob base, or the
    /// parent of a plain path.
    pub fn watch_dir(&self) -> WatchDir {
        let (path, literal) = glob_base(self.pattern.trim().trim_start_matches("./"));
        WatchDir {
            path,
            recursive: !literal,
        }
    }
}

/// All watch bindings of a project.
#[derive(Debug, Clone, Default)]
pub struct BindingSet {
    bindings: Vec<Binding>,
}

impl BindingSet {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }

    pub fn from_config(entries: &[WatchBindingConfig]) -> Result<Self> {
        let bindings = entries
            .iter()
            .map(|entry| Binding::new(entry.pattern.clone(), entry.task.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { bindings })
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    /// Every task some binding can trigger.
    pub fn tasks(&self) -> BTreeSet<TaskName> {
        self.bindings.iter().map(|b| b.task.clone()).collect()
    }

    /// Tasks whose bindings match `rel_path`.
    pub fn tasks_for(&self, rel_path: &str) -> BTreeSet<TaskName> {
        self.bindings
            .iter()
            .filter(|b| b.matches(rel_path))
            .map(|b| b.task.clone())
            .collect()
    }

    pub fn matches_any(&self, rel_path: &str) -> bool {
        self.bindings.iter().any(|b| b.matches(rel_path))
    }

    /// Directories to subscribe to, deduplicated. Entries already covered by
    /// a recursive ancestor are dropped.
    pub fn watch_dirs(&self) -> Vec<WatchDir> {
        let all: BTreeSet<WatchDir> = self.bindings.iter().map(Binding::watch_dir).collect();
        all.iter()
            .filter(|dir| {
                !all.iter().any(|other| {
                    other != *dir && other.recursive && dir.path.starts_with(&other.path)
                })
            })
            .cloned()
            .collect()
    }
}
