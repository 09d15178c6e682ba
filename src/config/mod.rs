// src/config/mod.rs

//! Configuration for sitepipe.
//!
//! - [`model`] is the TOML-backed data model with stock defaults.
//! - [`loader`] reads `Sitepipe.toml` (or falls back to defaults).
//! - [`validate`] turns a `RawConfigFile` into a checked `ConfigFile`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default, parse_and_validate};
pub use model::{
    default_copy_tasks, BuildSection, ConfigFile, CopyTaskConfig, JsLintConfig, LintSection,
    RawConfigFile, ScriptsSection, ScssLintConfig, ServerSection, StylesSection,
    WatchBindingConfig, WatchConfig, WatchSection,
};
