// src/exec/mod.rs

//! Process execution layer.
//!
//! The default style compiler, transpiler and minifier are external
//! programs. [`command`] runs one of them as a filter: optional bytes on
//! stdin, captured stdout and stderr, exit status.

pub mod command;

pub use command::{run_filter, FilterOutput};
