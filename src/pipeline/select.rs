// src/pipeline/select.rs

//! Source selections: ordered glob patterns where a leading `!` excludes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};

use crate::errors::{BuildError, Result};

/// A file picked by a [`Selection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Absolute (root-joined) path on disk.
    pub abs: PathBuf,
    /// Path below the pattern's glob base; this is what lands under `dest`.
    pub relative: PathBuf,
}

#[derive(Clone)]
struct Include {
    pattern: String,
    /// Leading components without glob metacharacters.
    base: PathBuf,
    /// Pattern names exactly one file.
    literal: bool,
    matcher: GlobMatcher,
}

/// Compiled source selection.
#[derive(Clone)]
pub struct Selection {
    include: Vec<Include>,
    exclude: GlobSet,
    excluded_patterns: Vec<String>,
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field(
                "include",
                &self.include.iter().map(|i| &i.pattern).collect::<Vec<_>>(),
            )
            .field("exclude", &self.excluded_patterns)
            .finish()
    }
}

fn is_glob_component(component: &str) -> bool {
    component.contains(['*', '?', '[', '{'])
}

fn normalise(pattern: &str) -> &str {
    pattern.trim().trim_start_matches("./")
}

fn compile(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern).literal_separator(true).build()?;
    Ok(glob.compile_matcher())
}

/// Split `pattern` into its glob base and whether it is a plain path.
pub(crate) fn glob_base(pattern: &str) -> (PathBuf, bool) {
    let components: Vec<&str> = pattern.split('/').collect();
    match components.iter().position(|c| is_glob_component(c)) {
        Some(first_glob) => (components[..first_glob].iter().collect(), false),
        None => {
            let parent = Path::new(pattern)
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            (parent, true)
        }
    }
}

/// Render a root-relative path with forward slashes for glob matching.
pub(crate) fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

impl Selection {
    /// Compile `patterns`. At least one non-excluding pattern is required.
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut include = Vec::new();
        let mut exclude = GlobSetBuilder::new();
        let mut excluded_patterns = Vec::new();

        for raw in patterns {
            if let Some(negated) = raw.trim().strip_prefix('!') {
                let pattern = normalise(negated);
                if pattern.is_empty() {
                    return Err(BuildError::Config("empty exclusion pattern".to_string()));
                }
                exclude.add(GlobBuilder::new(pattern).literal_separator(true).build()?);
                excluded_patterns.push(pattern.to_string());
                continue;
            }

            let pattern = normalise(raw);
            if pattern.is_empty() {
                return Err(BuildError::Config("empty source pattern".to_string()));
            }
            let (base, literal) = glob_base(pattern);
            include.push(Include {
                pattern: pattern.to_string(),
                base,
                literal,
                matcher: compile(pattern)?,
            });
        }

        if include.is_empty() {
            return Err(BuildError::Config(
                "a source selection needs at least one non-excluding pattern".to_string(),
            ));
        }

        Ok(Self {
            include,
            exclude: exclude.build()?,
            excluded_patterns,
        })
    }

    /// Whether a root-relative path (forward slashes) is selected.
    pub fn is_match(&self, rel_path: &str) -> bool {
        !self.exclude.is_match(rel_path)
            && self.include.iter().any(|inc| inc.matcher.is_match(rel_path))
    }

    /// Resolve against the project `root`.
    ///
    /// Returns entries sorted by path with duplicates removed (the first
    /// pattern to select a file decides its relative path). A plain path that
    /// does not exist is an error; a glob that matches nothing is only
    /// logged.
    pub fn resolve(&self, root: &Path) -> Result<Vec<SourceEntry>> {
        let mut picked: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();

        for inc in &self.include {
            let before = picked.len();

            if inc.literal {
                let abs = root.join(&inc.pattern);
                if !abs.is_file() {
                    return Err(BuildError::MissingSource(abs));
                }
                if !self.exclude.is_match(&inc.pattern) {
                    let relative = Path::new(&inc.pattern)
                        .strip_prefix(&inc.base)
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|_| PathBuf::from(&inc.pattern));
                    picked.entry(abs).or_insert(relative);
                }
            } else {
                for abs in walk_files(&root.join(&inc.base))? {
                    let Ok(rel_to_root) = abs.strip_prefix(root) else {
                        continue;
                    };
                    let rel_str = slash_path(rel_to_root);
                    if !inc.matcher.is_match(&rel_str) || self.exclude.is_match(&rel_str) {
                        continue;
                    }
                    let relative = rel_to_root
                        .strip_prefix(&inc.base)
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|_| rel_to_root.to_path_buf());
                    picked.entry(abs).or_insert(relative);
                }

                if picked.len() == before {
                    warn!(pattern = %inc.pattern, root = ?root, "source pattern matched no files");
                }
            }
        }

        debug!(selection = ?self, files = picked.len(), "resolved selection");

        Ok(picked
            .into_iter()
            .map(|(abs, relative)| SourceEntry { abs, relative })
            .collect())
    }
}

/// All regular files below `dir`; empty if `dir` does not exist.
fn walk_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !dir.is_dir() {
        return Ok(files);
    }

    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
