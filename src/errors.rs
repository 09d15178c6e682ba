// src/errors.rs

//! Crate-wide error type.
//!
//! Configuration problems (bad task graph, bad config file) are detected
//! before any task action runs. Task-level failures (compile, transpile,
//! minify, lint, missing sources) abort the owning branch and surface to the
//! caller wrapped in [`BuildError::TaskFailed`].

use std::path::PathBuf;

use thiserror::Error;

use crate::graph::{RunSummary, TaskName};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("task '{0}' is already registered")]
    DuplicateTask(TaskName),

    #[error("registering task '{task}' would introduce a dependency cycle through '{via}'")]
    Cycle { task: TaskName, via: TaskName },

    #[error("task '{task}' depends on unregistered task '{prerequisite}'")]
    UnresolvedPrerequisite {
        task: TaskName,
        prerequisite: TaskName,
    },

    #[error("Task not found: {0}")]
    UnknownTask(TaskName),

    #[error("failed to compile {file}: {message}")]
    Compile { file: PathBuf, message: String },

    #[error("failed to transpile {file}: {message}")]
    Transpile { file: PathBuf, message: String },

    #[error("failed to minify {file}: {message}")]
    Minify { file: PathBuf, message: String },

    #[error("{task}: {count} lint violation(s) found")]
    Lint { task: TaskName, count: usize },

    #[error("no such source file: {0}")]
    MissingSource(PathBuf),

    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        task: TaskName,
        source: Box<BuildError>,
        summary: RunSummary,
    },

    #[error("Server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("file watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BuildError {
    /// Whether this error describes a broken task graph or config rather
    /// than a failing task.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BuildError::Config(_)
                | BuildError::DuplicateTask(_)
                | BuildError::Cycle { .. }
                | BuildError::UnresolvedPrerequisite { .. }
                | BuildError::UnknownTask(_)
                | BuildError::Toml(_)
        )
    }

    /// Follow `TaskFailed` wrappers down to the error that actually failed.
    pub fn root_cause(&self) -> &BuildError {
        match self {
            BuildError::TaskFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildError>;
