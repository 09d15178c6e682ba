// src/tasks.rs

//! The stock task graph of a sitepipe project.
//!
//! Leaves: one copy task per `[copy.<name>]` entry, `styles`, `js` and the
//! two lint gates. `server` and `watch` start background services. `start`
//! groups everything (lint-gated through `runs_after` edges); `deploy` groups
//! only the copy/compile leaves.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::ConfigFile;
use crate::errors::Result;
use crate::graph::{Task, TaskContext, TaskGraph, TaskName};
use crate::lint::{LintTask, Ruleset, ScriptLinter, StyleLinter};
use crate::pipeline::{
    AssetStream, MinifyStage, Selection, StyleOptions, StyleStage, Toolchain, TranspileOptions,
    TranspileStage,
};
use crate::server::{DevServer, ServerOptions};
use crate::watch::{BindingSet, Dispatcher, GraphDispatcher, spawn_watch};

/// Names of the built-in tasks.
pub mod names {
    pub const STYLES: &str = "styles";
    pub const JS: &str = "js";
    pub const SCSS_LINT: &str = "scss-lint";
    pub const JS_LINT: &str = "js-lint";
    pub const WATCH: &str = "watch";
    pub const SERVER: &str = "server";
    pub const START: &str = "start";
    pub const DEPLOY: &str = "deploy";

    /// Names a `[copy.<name>]` entry may not take.
    pub const RESERVED: [&str; 8] = [STYLES, JS, SCSS_LINT, JS_LINT, WATCH, SERVER, START, DEPLOY];

    /// Built-in tasks a watch binding may target (besides copy tasks).
    pub const REBUILDABLE: [&str; 4] = [STYLES, JS, SCSS_LINT, JS_LINT];
}

/// Everything needed to build the graph: where the project lives, its
/// validated config and the external tools.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config: ConfigFile,
    pub toolchain: Toolchain,
}

impl Project {
    /// A project using the command-line tools named in `config`.
    pub fn new(root: impl Into<PathBuf>, config: ConfigFile) -> Self {
        let root = root.into();
        let toolchain = Toolchain::from_config(&config, &root);
        Self {
            root,
            config,
            toolchain,
        }
    }

    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// Directory served by `server`.
    pub fn serve_root(&self) -> PathBuf {
        self.root.join(self.config.server_root())
    }
}

/// Register every task of `project` into a fresh graph.
pub fn build_graph(project: &Project) -> Result<TaskGraph> {
    let cfg = &project.config;
    let mut graph = TaskGraph::new();

    let lints = [names::SCSS_LINT, names::JS_LINT];
    let mut outputs: Vec<TaskName> = Vec::new();

    for (name, copy) in &cfg.copy {
        let stream = AssetStream::new(
            name.clone(),
            Selection::new(&copy.sources)?,
            cfg.output_path(&copy.dest),
        );
        let mut task = stream_task(stream, &project.root).runs_after(lints);
        if let Some(description) = &copy.description {
            task = task.describe(description.clone());
        }
        graph.register_task(task)?;
        outputs.push(name.clone());
    }

    let styles = AssetStream::new(
        names::STYLES,
        Selection::new(std::slice::from_ref(&cfg.styles.entry))?,
        cfg.output_path(&cfg.styles.dest),
    )
    .stage(Arc::new(StyleStage::new(
        Arc::clone(&project.toolchain.style_compiler),
        StyleOptions {
            include_paths: cfg
                .styles
                .include_paths
                .iter()
                .map(|p| project.root.join(p))
                .collect(),
            output_style: cfg.styles.output_style,
        },
    )));
    graph.register_task(
        stream_task(styles, &project.root)
            .runs_after(lints)
            .describe("Compile the Sass entry point to CSS"),
    )?;
    outputs.push(names::STYLES.to_string());

    let js = AssetStream::new(
        names::JS,
        Selection::new(&cfg.scripts.sources)?,
        cfg.output_path(&cfg.scripts.dest),
    )
    .stage(Arc::new(TranspileStage::new(
        Arc::clone(&project.toolchain.transpiler),
        TranspileOptions {
            target_preset: cfg.scripts.target_preset.clone(),
        },
    )))
    .stage(Arc::new(MinifyStage::new(Arc::clone(
        &project.toolchain.minifier,
    ))));
    graph.register_task(
        stream_task(js, &project.root)
            .runs_after(lints)
            .describe("Transpile and minify scripts"),
    )?;
    outputs.push(names::JS.to_string());

    let scss_lint = LintTask::new(
        names::SCSS_LINT,
        Selection::new(&cfg.lint.scss.sources)?,
        Ruleset::style().without(&cfg.lint.scss.disable)?,
        Arc::new(StyleLinter),
    );
    graph.register_task(lint_task(scss_lint, &project.root).describe("Lint style sheets"))?;

    let js_lint = LintTask::new(
        names::JS_LINT,
        Selection::new(&cfg.lint.js.sources)?,
        Ruleset::script().without(&cfg.lint.js.disable)?,
        Arc::new(ScriptLinter),
    );
    graph.register_task(lint_task(js_lint, &project.root).describe("Lint scripts"))?;

    graph.register_task(
        server_task(project)
            .runs_after(outputs.iter().cloned())
            .describe("Serve the output directory with live reload"),
    )?;
    graph.register_task(
        watch_task(project)?
            .runs_after(outputs.iter().cloned())
            .describe("Re-run tasks when their sources change"),
    )?;

    graph.register_task(
        Task::new(names::START)
            .depends_on(lints)
            .depends_on(outputs.iter().cloned())
            .depends_on([names::SERVER, names::WATCH])
            .describe("Lint, build, serve and watch"),
    )?;
    graph.register_task(
        Task::new(names::DEPLOY)
            .depends_on(outputs.iter().cloned())
            .describe("Build every output for production"),
    )?;

    debug!(tasks = graph.len(), root = ?project.root, "task graph built");
    Ok(graph)
}

fn stream_task(stream: AssetStream, root: &Path) -> Task {
    let name = stream.task().to_string();
    let stream = Arc::new(stream);
    let root = root.to_path_buf();
    Task::new(name).action(move |_ctx: TaskContext| {
        let stream = Arc::clone(&stream);
        let root = root.clone();
        async move { stream.run(&root).await.map(|_| ()) }
    })
}

fn lint_task(lint: LintTask, root: &Path) -> Task {
    let name = lint.task().to_string();
    let lint = Arc::new(lint);
    let root = root.to_path_buf();
    Task::new(name).action(move |_ctx: TaskContext| {
        let lint = Arc::clone(&lint);
        let root = root.clone();
        async move { lint.run(&root).await }
    })
}

fn server_task(project: &Project) -> Task {
    let root = project.serve_root();
    let server = &project.config.server;
    let options = ServerOptions {
        host: server.host.clone(),
        port: server.port,
        live_reload: server.live_reload,
        open: server.open,
    };
    Task::new(names::SERVER).action(move |ctx: TaskContext| {
        let root = root.clone();
        let options = options.clone();
        async move {
            let handle = DevServer::start(root, options)?;
            ctx.services.register(Box::new(handle));
            Ok(())
        }
    })
}

fn watch_task(project: &Project) -> Result<Task> {
    let bindings = BindingSet::from_config(&project.config.watch.binding)?;
    let debounce = Duration::from_millis(project.config.watch.debounce_ms);
    let root = project.root.clone();
    Ok(Task::new(names::WATCH).action(move |ctx: TaskContext| {
        let bindings = bindings.clone();
        let root = root.clone();
        async move {
            let dispatcher: Arc<dyn Dispatcher> = Arc::new(GraphDispatcher::new(
                Arc::clone(&ctx.graph),
                ctx.services.clone(),
            ));
            let handle = spawn_watch(root, bindings, dispatcher, debounce)?;
            ctx.services.register(Box::new(handle));
            Ok(())
        }
    }))
}
