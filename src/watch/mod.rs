// src/watch/mod.rs

//! File watching for the `watch` task.
//!
//! Filesystem events are turned into root-relative paths, filtered by
//! content digest, matched against the `pattern -> task` bindings and fed
//! into the coordinator, which re-runs the bound tasks with coalescing.

pub mod coordinator;
pub mod digest;
pub mod patterns;
pub mod watcher;

pub use coordinator::{coordinate, BindingState, Dispatcher, GraphDispatcher, WatchCore};
pub use digest::{digest, ContentDigests};
pub use patterns::{Binding, BindingSet, WatchDir};
pub use watcher::{relative_str, spawn_watch, WatchHandle};
