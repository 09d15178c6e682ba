// src/watch/digest.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use blake3::Hasher;
use tracing::debug;

/// Last seen content hash of every watched file.
///
/// Editors and sync tools emit events for saves that do not change a byte
/// (touch, metadata, atomic replace with identical content); those are
/// filtered out here so they do not trigger a rebuild.
#[derive(Debug, Default)]
pub struct ContentDigests {
    seen: HashMap<PathBuf, String>,
}

/// Hex blake3 digest of `contents`.
pub fn digest(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    hasher.finalize().to_hex().to_string()
}

impl ContentDigests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current state of `path`; `None` means it no longer exists.
    ///
    /// Returns whether the content differs from what was last recorded. A
    /// path seen for the first time counts as changed.
    pub fn observe(&mut self, path: &Path, contents: Option<&[u8]>) -> bool {
        match contents {
            Some(bytes) => {
                let hash = digest(bytes);
                let changed = self.seen.get(path) != Some(&hash);
                if !changed {
                    debug!(path = ?path, "content unchanged; ignoring event");
                }
                self.seen.insert(path.to_path_buf(), hash);
                changed
            }
            None => {
                self.seen.remove(path);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
