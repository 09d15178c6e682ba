// src/pipeline/styles.rs

//! Style-sheet compilation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{BuildError, Result};
use crate::exec::run_filter;
use crate::pipeline::stage::{SourceFile, Stage};
use crate::types::{BoxFuture, OutputStyle};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleOptions {
    /// Extra `@import` search paths.
    pub include_paths: Vec<PathBuf>,
    pub output_style: OutputStyle,
}

/// Compiles one style-sheet entry point to CSS.
pub trait StyleCompiler: Send + Sync {
    /// Returns the CSS, or [`BuildError::Compile`].
    fn compile<'a>(
        &'a self,
        entry: &'a Path,
        options: &'a StyleOptions,
    ) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// The `sass` command line compiler.
#[derive(Debug, Clone)]
pub struct SassCommand {
    argv: Vec<String>,
    cwd: PathBuf,
}

impl SassCommand {
    pub fn new(argv: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            argv,
            cwd: cwd.into(),
        }
    }

    fn args(entry: &Path, options: &StyleOptions) -> Vec<String> {
        let mut args = vec![
            "--no-source-map".to_string(),
            format!("--style={}", options.output_style),
        ];
        args.extend(
            options
                .include_paths
                .iter()
                .map(|p| format!("--load-path={}", p.display())),
        );
        args.push(entry.display().to_string());
        args
    }
}

impl StyleCompiler for SassCommand {
    fn compile<'a>(
        &'a self,
        entry: &'a Path,
        options: &'a StyleOptions,
    ) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            let args = Self::args(entry, options);
            let output = run_filter(&self.argv, &args, None, &self.cwd)
                .await
                .map_err(|err| BuildError::Compile {
                    file: entry.to_path_buf(),
                    message: format!("{err:#}"),
                })?;

            if !output.success {
                return Err(BuildError::Compile {
                    file: entry.to_path_buf(),
                    message: output.stderr_text(),
                });
            }
            Ok(output.stdout)
        })
    }
}

/// Stage wrapping a [`StyleCompiler`]; renames the output to `.css`.
pub struct StyleStage {
    compiler: Arc<dyn StyleCompiler>,
    options: StyleOptions,
}

impl StyleStage {
    pub fn new(compiler: Arc<dyn StyleCompiler>, options: StyleOptions) -> Self {
        Self { compiler, options }
    }
}

impl Stage for StyleStage {
    fn name(&self) -> &str {
        "compile-styles"
    }

    fn apply(&self, mut file: SourceFile) -> BoxFuture<'_, Result<SourceFile>> {
        Box::pin(async move {
            file.contents = self.compiler.compile(&file.path, &self.options).await?;
            file.relative.set_extension("css");
            Ok(file)
        })
    }
}
