#![allow(dead_code)]

//! Deterministic stand-ins for the external tools and the watch dispatcher.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sitepipe::errors::{BuildError, Result};
use sitepipe::pipeline::{
    Minifier, StyleCompiler, StyleOptions, Toolchain, TranspileOptions, Transpiler,
};
use sitepipe::types::BoxFuture;
use sitepipe::watch::Dispatcher;

/// "Compiles" by prefixing a header naming the output style.
#[derive(Debug, Default)]
pub struct FakeStyleCompiler {
    pub calls: AtomicUsize,
}

impl StyleCompiler for FakeStyleCompiler {
    fn compile<'a>(
        &'a self,
        entry: &'a Path,
        options: &'a StyleOptions,
    ) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let source = tokio::fs::read_to_string(entry).await?;
            Ok(format!("/* {} */\n{source}", options.output_style).into_bytes())
        })
    }
}

/// Always fails with a compile error.
#[derive(Debug, Default)]
pub struct FailingStyleCompiler;

impl StyleCompiler for FailingStyleCompiler {
    fn compile<'a>(
        &'a self,
        entry: &'a Path,
        _options: &'a StyleOptions,
    ) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            Err(BuildError::Compile {
                file: entry.to_path_buf(),
                message: "Undefined variable.".to_string(),
            })
        })
    }
}

/// Prefixes a marker naming the preset.
#[derive(Debug, Default)]
pub struct FakeTranspiler;

impl Transpiler for FakeTranspiler {
    fn transpile<'a>(
        &'a self,
        _path: &'a Path,
        source: &'a [u8],
        options: &'a TranspileOptions,
    ) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            let mut out = format!("/* {} */\n", options.preset_package()).into_bytes();
            out.extend_from_slice(source);
            Ok(out)
        })
    }
}

/// Drops line breaks and indentation.
#[derive(Debug, Default)]
pub struct FakeMinifier;

impl Minifier for FakeMinifier {
    fn minify<'a>(&'a self, _path: &'a Path, source: &'a [u8]) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            let text = String::from_utf8_lossy(source);
            let joined: String = text.lines().map(str::trim).collect();
            Ok(joined.into_bytes())
        })
    }
}

/// Fails for every file whose name contains `needle`.
#[derive(Debug)]
pub struct FailingMinifier {
    pub needle: String,
}

impl Minifier for FailingMinifier {
    fn minify<'a>(&'a self, path: &'a Path, source: &'a [u8]) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            if path.to_string_lossy().contains(&self.needle) {
                return Err(BuildError::Minify {
                    file: path.to_path_buf(),
                    message: "Unexpected token".to_string(),
                });
            }
            Ok(source.to_vec())
        })
    }
}

/// Toolchain made of the deterministic fakes.
pub fn fake_toolchain() -> Toolchain {
    Toolchain {
        style_compiler: Arc::new(FakeStyleCompiler::default()),
        transpiler: Arc::new(FakeTranspiler),
        minifier: Arc::new(FakeMinifier),
    }
}

/// Records every dispatched task; each dispatch takes `delay`.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    pub delay: Duration,
    pub dispatched: Arc<Mutex<Vec<String>>>,
    /// Names of tasks whose dispatch should fail.
    pub failing: Vec<String>,
}

impl RecordingDispatcher {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn dispatched(&self) -> Vec<String> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn count(&self, task: &str) -> usize {
        self.dispatched().iter().filter(|t| *t == task).count()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch(&self, task: &str) -> BoxFuture<'static, Result<()>> {
        let dispatched = Arc::clone(&self.dispatched);
        let delay = self.delay;
        let task = task.to_string();
        let fail = self.failing.contains(&task);
        Box::pin(async move {
            dispatched.lock().unwrap().push(task.clone());
            tokio::time::sleep(delay).await;
            if fail {
                return Err(BuildError::Config(format!("{task} failed")));
            }
            Ok(())
        })
    }
}
