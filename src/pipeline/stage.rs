// src/pipeline/stage.rs

use std::path::PathBuf;

use crate::errors::Result;
use crate::types::BoxFuture;

/// One file travelling through a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Where the file was read from.
    pub path: PathBuf,
    /// Output path below the stream's destination.
    pub relative: PathBuf,
    pub contents: Vec<u8>,
}

/// A transform applied to every file of a stream, in order.
///
/// A stage may rewrite the contents and rename `relative`; an error fails
/// the whole stream before anything is written.
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, file: SourceFile) -> BoxFuture<'_, Result<SourceFile>>;
}
