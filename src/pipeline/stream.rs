// src/pipeline/stream.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::Result;
use crate::graph::TaskName;
use crate::pipeline::select::Selection;
use crate::pipeline::stage::{SourceFile, Stage};

/// Selection, stages and destination of a copy/transform task.
#[derive(Clone)]
pub struct AssetStream {
    task: TaskName,
    selection: Selection,
    stages: Vec<Arc<dyn Stage>>,
    /// Destination directory, relative to the project root.
    dest: PathBuf,
}

impl std::fmt::Debug for AssetStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetStream")
            .field("task", &self.task)
            .field("selection", &self.selection)
            .field(
                "stages",
                &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("dest", &self.dest)
            .finish()
    }
}

impl AssetStream {
    pub fn new(task: impl Into<TaskName>, selection: Selection, dest: impl Into<PathBuf>) -> Self {
        Self {
            task: task.into(),
            selection,
            stages: Vec::new(),
            dest: dest.into(),
        }
    }

    pub fn stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    /// Run every selected file through the stages, then write the results.
    ///
    /// Nothing is written unless every file made it through every stage.
    /// Returns the written paths (absolute).
    pub async fn run(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let entries = self.selection.resolve(root)?;
        let mut outputs: Vec<SourceFile> = Vec::with_capacity(entries.len());

        for entry in entries {
            let contents = tokio::fs::read(&entry.abs).await?;
            let mut file = SourceFile {
                path: entry.abs,
                relative: entry.relative,
                contents,
            };
            for stage in &self.stages {
                debug!(task = %self.task, stage = stage.name(), path = ?file.path, "applying stage");
                file = stage.apply(file).await?;
            }
            outputs.push(file);
        }

        let dest = root.join(&self.dest);
        let mut written = Vec::with_capacity(outputs.len());
        for file in outputs {
            let target = dest.join(&file.relative);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, &file.contents).await?;
            debug!(task = %self.task, path = ?target, bytes = file.contents.len(), "wrote output");
            written.push(target);
        }

        info!(task = %self.task, files = written.len(), dest = ?self.dest, "stream finished");
        Ok(written)
    }
}
