// src/pipeline/mod.rs

//! Copy/transform streams.
//!
//! A stream resolves a [`Selection`], pushes every file through its
//! [`Stage`]s in memory and only then writes the results below its
//! destination, keeping paths relative to the selection's glob base.

pub mod scripts;
pub mod select;
pub mod stage;
pub mod stream;
pub mod styles;

use std::path::Path;
use std::sync::Arc;

use crate::config::ConfigFile;

pub use scripts::{
    CommandMinifier, CommandTranspiler, Minifier, MinifyStage, TranspileOptions, TranspileStage,
    Transpiler,
};
pub use select::{Selection, SourceEntry};
pub use stage::{SourceFile, Stage};
pub use stream::AssetStream;
pub use styles::{SassCommand, StyleCompiler, StyleOptions, StyleStage};

/// The external collaborators used by `styles` and `js`.
#[derive(Clone)]
pub struct Toolchain {
    pub style_compiler: Arc<dyn StyleCompiler>,
    pub transpiler: Arc<dyn Transpiler>,
    pub minifier: Arc<dyn Minifier>,
}

impl std::fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolchain").finish_non_exhaustive()
    }
}

impl Toolchain {
    /// Command-line collaborators as configured in `[styles]` and `[scripts]`,
    /// run from `root`.
    pub fn from_config(cfg: &ConfigFile, root: &Path) -> Self {
        Self {
            style_compiler: Arc::new(SassCommand::new(cfg.styles.compiler.clone(), root)),
            transpiler: Arc::new(CommandTranspiler::new(cfg.scripts.transpiler.clone(), root)),
            minifier: Arc::new(CommandMinifier::new(cfg.scripts.minifier.clone(), root)),
        }
    }
}
