// src/lint/mod.rs

//! Lint gates for `scss-lint` and `js-lint`.
//!
//! A lint task resolves its selection, runs a [`Linter`] over every file
//! against a [`Ruleset`], prints the violations and fails when there is at
//! least one.

pub mod rules;
pub mod script;
pub mod scss;
pub mod source;

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{BuildError, Result};
use crate::graph::TaskName;
use crate::pipeline::Selection;

pub use rules::{
    compile_pattern, Case, ColonNotation, Expect, HexLength, Notation, Quote, RuleEntry,
    RuleFamily, RuleOption, RuleSetting, Ruleset, SettingKind, SCRIPT_RULES, STYLE_RULES,
};
pub use script::ScriptLinter;
pub use scss::StyleLinter;

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub file: PathBuf,
    /// 1-based.
    pub line: usize,
    /// 1-based, in characters.
    pub column: usize,
    pub rule: String,
    pub message: String,
}

/// A source checker.
pub trait Linter: Send + Sync {
    fn lint(&self, path: &Path, source: &str, rules: &Ruleset) -> Vec<Violation>;

    /// Rules in `rules` this linter does not evaluate.
    fn advisory_rules(&self, _rules: &Ruleset) -> BTreeSet<&'static str> {
        BTreeSet::new()
    }
}

/// A lint gate bound to its selection and rules.
#[derive(Clone)]
pub struct LintTask {
    task: TaskName,
    selection: Selection,
    ruleset: Ruleset,
    linter: Arc<dyn Linter>,
}

impl std::fmt::Debug for LintTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LintTask")
            .field("task", &self.task)
            .field("selection", &self.selection)
            .field("rules", &self.ruleset.len())
            .finish()
    }
}

impl LintTask {
    pub fn new(
        task: impl Into<TaskName>,
        selection: Selection,
        ruleset: Ruleset,
        linter: Arc<dyn Linter>,
    ) -> Self {
        let task = task.into();
        let advisory = linter.advisory_rules(&ruleset);
        if !advisory.is_empty() {
            debug!(task = %task, ?advisory, "rules listed but not evaluated");
        }
        Self {
            task,
            selection,
            ruleset,
            linter,
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    /// Lint every selected file below `root`. Paths in the result are
    /// relative to `root`.
    pub async fn check(&self, root: &Path) -> Result<Vec<Violation>> {
        let entries = self.selection.resolve(root)?;
        let mut violations = Vec::new();

        for entry in entries {
            let source = tokio::fs::read_to_string(&entry.abs).await?;
            let shown = entry
                .abs
                .strip_prefix(root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| entry.abs.clone());
            let found = self.linter.lint(&shown, &source, &self.ruleset);
            debug!(task = %self.task, file = ?shown, violations = found.len(), "linted");
            violations.extend(found);
        }

        Ok(violations)
    }

    /// Lint, print the report on stdout and fail if anything was found.
    pub async fn run(&self, root: &Path) -> Result<()> {
        let violations = self.check(root).await?;
        if violations.is_empty() {
            info!(task = %self.task, "no lint violations");
            return Ok(());
        }

        print!("{}", format_report(&violations));
        warn!(task = %self.task, count = violations.len(), "lint violations found");
        Err(BuildError::Lint {
            task: self.task.clone(),
            count: violations.len(),
        })
    }
}

/// `path:line:column  rule  message`, one violation per line.
pub fn format_report(violations: &[Violation]) -> String {
    let mut out = String::new();
    for v in violations {
        let _ = writeln!(
            out,
            "{}:{}:{}  {}  {}",
            v.file.display(),
            v.line,
            v.column,
            v.rule,
            v.message
        );
    }
    out
}
