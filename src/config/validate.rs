// src/config/validate.rs

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::config::model::{
    default_bindings, default_copy_tasks, ConfigFile, CopyTaskConfig, RawConfigFile,
    WatchBindingConfig, WatchConfig,
};
use crate::errors::{BuildError, Result};
use crate::lint::Ruleset;
use crate::pipeline::Selection;
use crate::tasks::names;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = BuildError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let copy = effective_copy_tasks(&raw.copy);
        validate_raw_config(&raw, &copy)?;
        let watch = effective_watch(&raw, &copy)?;
        Ok(ConfigFile::new_unchecked(raw, copy, watch))
    }
}

/// Merge user `[copy.<name>]` entries over the stock ones and drop the
/// disabled ones.
fn effective_copy_tasks(
    user: &BTreeMap<String, CopyTaskConfig>,
) -> BTreeMap<String, CopyTaskConfig> {
    let mut merged = default_copy_tasks();
    for (name, task) in user {
        merged.insert(name.clone(), task.clone());
    }
    merged.retain(|_, task| task.enabled);
    merged
}

fn validate_raw_config(
    cfg: &RawConfigFile,
    copy: &BTreeMap<String, CopyTaskConfig>,
) -> Result<()> {
    validate_build(cfg)?;
    validate_styles(cfg)?;
    validate_scripts(cfg)?;
    validate_copy_tasks(copy)?;
    validate_lint(cfg)?;
    validate_server(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> BuildError {
    BuildError::Config(msg.into())
}

fn validate_build(cfg: &RawConfigFile) -> Result<()> {
    if cfg.build.output.trim().is_empty() {
        return Err(config_error("[build].output must not be empty"));
    }
    Ok(())
}

fn validate_styles(cfg: &RawConfigFile) -> Result<()> {
    let styles = &cfg.styles;
    if styles.entry.trim().is_empty() {
        return Err(config_error("[styles].entry must not be empty"));
    }
    if styles.entry.starts_with('!') {
        return Err(config_error("[styles].entry cannot be an exclusion pattern"));
    }
    if styles.compiler.is_empty() || styles.compiler[0].trim().is_empty() {
        return Err(config_error("[styles].compiler must name a program"));
    }
    Selection::new(std::slice::from_ref(&styles.entry))?;
    Ok(())
}

fn validate_scripts(cfg: &RawConfigFile) -> Result<()> {
    let scripts = &cfg.scripts;
    Selection::new(&scripts.sources)
        .map_err(|e| config_error(format!("[scripts].sources: {e}")))?;
    if scripts.transpiler.is_empty() || scripts.transpiler[0].trim().is_empty() {
        return Err(config_error("[scripts].transpiler must name a program"));
    }
    if scripts.minifier.is_empty() || scripts.minifier[0].trim().is_empty() {
        return Err(config_error("[scripts].minifier must name a program"));
    }
    if scripts.target_preset.trim().is_empty() {
        return Err(config_error("[scripts].target_preset must not be empty"));
    }
    Ok(())
}

fn validate_copy_tasks(copy: &BTreeMap<String, CopyTaskConfig>) -> Result<()> {
    for (name, task) in copy {
        if names::RESERVED.contains(&name.as_str()) {
            return Err(config_error(format!(
                "copy task '{name}' clashes with the built-in task of the same name"
            )));
        }
        if name.trim().is_empty() {
            return Err(config_error("copy task names must not be empty"));
        }
        Selection::new(&task.sources)
            .map_err(|e| config_error(format!("[copy.{name}].sources: {e}")))?;
    }
    Ok(())
}

fn validate_lint(cfg: &RawConfigFile) -> Result<()> {
    Selection::new(&cfg.lint.scss.sources)
        .map_err(|e| config_error(format!("[lint.scss].sources: {e}")))?;
    Selection::new(&cfg.lint.js.sources)
        .map_err(|e| config_error(format!("[lint.js].sources: {e}")))?;

    Ruleset::style().without(&cfg.lint.scss.disable)?;
    Ruleset::script().without(&cfg.lint.js.disable)?;
    Ok(())
}

/// Resolve the bindings in effect.
///
/// Bindings written by the user must all name a task the watcher can re-run.
/// Stock bindings whose copy task was disabled are dropped instead.
fn effective_watch(
    cfg: &RawConfigFile,
    copy: &BTreeMap<String, CopyTaskConfig>,
) -> Result<WatchConfig> {
    if cfg.watch.debounce_ms == 0 {
        return Err(config_error("[watch].debounce_ms must be >= 1 (got 0)"));
    }

    let known: BTreeSet<&str> = names::REBUILDABLE
        .iter()
        .copied()
        .chain(copy.keys().map(|k| k.as_str()))
        .collect();

    let binding: Vec<WatchBindingConfig> = match &cfg.watch.binding {
        Some(user) => {
            for binding in user {
                if !known.contains(binding.task.as_str()) {
                    return Err(config_error(format!(
                        "watch binding '{}' names task '{}', which cannot be re-run by the watcher",
                        binding.pattern, binding.task
                    )));
                }
            }
            user.clone()
        }
        None => default_bindings()
            .into_iter()
            .filter(|binding| {
                let keep = known.contains(binding.task.as_str());
                if !keep {
                    debug!(
                        pattern = %binding.pattern,
                        task = %binding.task,
                        "stock watch binding dropped; task disabled"
                    );
                }
                keep
            })
            .collect(),
    };

    for entry in &binding {
        Selection::new(std::slice::from_ref(&entry.pattern))
            .map_err(|e| config_error(format!("watch binding '{}': {e}", entry.pattern)))?;
    }

    Ok(WatchConfig {
        debounce_ms: cfg.watch.debounce_ms,
        binding,
    })
}

fn validate_server(cfg: &RawConfigFile) -> Result<()> {
    if cfg.server.host.trim().is_empty() {
        return Err(config_error("[server].host must not be empty"));
    }
    if let Some(root) = &cfg.server.root {
        if root.trim().is_empty() {
            return Err(config_error("[server].root must not be empty when set"));
        }
    }
    Ok(())
}
