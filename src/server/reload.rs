// src/server/reload.rs

//! Live reload.
//!
//! Served HTML pages poll [`RELOAD_PATH`] for a generation number. A watcher
//! on the served directory bumps the generation whenever output changes, and
//! a page reloads itself once the number it sees differs from the first one.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use notify::event::{EventKind, ModifyKind};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::debug;

use crate::errors::Result;

pub const RELOAD_PATH: &str = "/__sitepipe/reload";

const POLL_INTERVAL_MS: u64 = 1000;

/// Monotonic counter of output changes.
#[derive(Debug, Default)]
pub struct ReloadState {
    generation: AtomicU64,
}

impl ReloadState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Returns the new generation.
    pub fn bump(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

pub fn reload_script() -> String {
    format!(
        "<script>(function(){{var seen=null;function poll(){{fetch('{RELOAD_PATH}',{{cache:'no-store'}})\
.then(function(r){{return r.text();}}).then(function(g){{if(seen===null){{seen=g;}}else if(g!==seen){{location.reload();return;}}\
setTimeout(poll,{POLL_INTERVAL_MS});}}).catch(function(){{setTimeout(poll,{POLL_INTERVAL_MS});}});}}poll();}})();</script>"
    )
}

/// Insert the reload script before the last `</body>`, or append it when the
/// page has none.
pub fn inject_script(html: &str) -> String {
    let script = reload_script();
    let lower = html.to_ascii_lowercase();
    match lower.rfind("</body>") {
        Some(at) => {
            let mut out = String::with_capacity(html.len() + script.len());
            out.push_str(&html[..at]);
            out.push_str(&script);
            out.push_str(&html[at..]);
            out
        }
        None => format!("{html}{script}"),
    }
}

/// Bump `state` on every content change under `root`.
pub fn watch_output(root: &Path, state: Arc<ReloadState>) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if changes_content(&event.kind) {
                    let generation = state.bump();
                    debug!(generation, paths = ?event.paths, "served output changed");
                }
            }
            Err(err) => eprintln!("sitepipe: live reload watch error: {err}"),
        },
        Config::default(),
    )?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    Ok(watcher)
}

fn changes_content(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Any
    ) || matches!(kind, EventKind::Modify(m) if !matches!(m, ModifyKind::Metadata(_)))
}
