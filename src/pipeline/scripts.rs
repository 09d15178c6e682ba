// src/pipeline/scripts.rs

//! Script transpilation and minification.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{BuildError, Result};
use crate::exec::run_filter;
use crate::pipeline::stage::{SourceFile, Stage};
use crate::types::BoxFuture;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileOptions {
    /// Preset name; `env` resolves to `@babel/preset-env`.
    pub target_preset: String,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self {
            target_preset: "env".to_string(),
        }
    }
}

impl TranspileOptions {
    /// Fully qualified preset package.
    pub fn preset_package(&self) -> String {
        let preset = self.target_preset.trim();
        if preset.starts_with('@') || preset.contains('/') {
            preset.to_string()
        } else {
            format!("@babel/preset-{preset}")
        }
    }
}

/// Rewrites modern script source for the target environment.
pub trait Transpiler: Send + Sync {
    /// Returns the transpiled source, or [`BuildError::Transpile`].
    fn transpile<'a>(
        &'a self,
        path: &'a Path,
        source: &'a [u8],
        options: &'a TranspileOptions,
    ) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// Shrinks script source.
pub trait Minifier: Send + Sync {
    /// Returns the minified source, or [`BuildError::Minify`].
    fn minify<'a>(&'a self, path: &'a Path, source: &'a [u8]) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// Transpiler backed by a command reading source on stdin (`npx babel`).
#[derive(Debug, Clone)]
pub struct CommandTranspiler {
    argv: Vec<String>,
    cwd: PathBuf,
}

impl CommandTranspiler {
    pub fn new(argv: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            argv,
            cwd: cwd.into(),
        }
    }
}

impl Transpiler for CommandTranspiler {
    fn transpile<'a>(
        &'a self,
        path: &'a Path,
        source: &'a [u8],
        options: &'a TranspileOptions,
    ) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            let args = vec![
                format!("--presets={}", options.preset_package()),
                "--filename".to_string(),
                path.display().to_string(),
            ];
            let fail = |message: String| BuildError::Transpile {
                file: path.to_path_buf(),
                message,
            };

            let output = run_filter(&self.argv, &args, Some(source.to_vec()), &self.cwd)
                .await
                .map_err(|err| fail(format!("{err:#}")))?;
            if !output.success {
                return Err(fail(output.stderr_text()));
            }
            Ok(output.stdout)
        })
    }
}

/// Minifier backed by a command reading source on stdin (`npx terser`).
#[derive(Debug, Clone)]
pub struct CommandMinifier {
    argv: Vec<String>,
    cwd: PathBuf,
}

impl CommandMinifier {
    pub fn new(argv: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            argv,
            cwd: cwd.into(),
        }
    }
}

impl Minifier for CommandMinifier {
    fn minify<'a>(&'a self, path: &'a Path, source: &'a [u8]) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            let args = vec!["--compress".to_string(), "--mangle".to_string()];
            let fail = |message: String| BuildError::Minify {
                file: path.to_path_buf(),
                message,
            };

            let output = run_filter(&self.argv, &args, Some(source.to_vec()), &self.cwd)
                .await
                .map_err(|err| fail(format!("{err:#}")))?;
            if !output.success {
                return Err(fail(output.stderr_text()));
            }
            Ok(output.stdout)
        })
    }
}

pub struct TranspileStage {
    transpiler: Arc<dyn Transpiler>,
    options: TranspileOptions,
}

impl TranspileStage {
    pub fn new(transpiler: Arc<dyn Transpiler>, options: TranspileOptions) -> Self {
        Self {
            transpiler,
            options,
        }
    }
}

impl Stage for TranspileStage {
    fn name(&self) -> &str {
        "transpile"
    }

    fn apply(&self, mut file: SourceFile) -> BoxFuture<'_, Result<SourceFile>> {
        Box::pin(async move {
            file.contents = self
                .transpiler
                .transpile(&file.path, &file.contents, &self.options)
                .await?;
            Ok(file)
        })
    }
}

pub struct MinifyStage {
    minifier: Arc<dyn Minifier>,
}

impl MinifyStage {
    pub fn new(minifier: Arc<dyn Minifier>) -> Self {
        Self { minifier }
    }
}

impl Stage for MinifyStage {
    fn name(&self) -> &str {
        "minify"
    }

    fn apply(&self, mut file: SourceFile) -> BoxFuture<'_, Result<SourceFile>> {
        Box::pin(async move {
            file.contents = self.minifier.minify(&file.path, &file.contents).await?;
            Ok(file)
        })
    }
}
