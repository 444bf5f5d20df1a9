//! Error types for the md2book library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BookError`] — **Fatal**: the build cannot proceed at all (unreadable
//!   working directory, a chapter file that breaks the strict naming rule,
//!   a working copy that cannot be written). Returned as `Err(BookError)`
//!   from [`crate::build`].
//!
//! * [`DiagramError`] — **Non-fatal**: a single diagram failed to render but
//!   the rest of the document is fine. Stored inside
//!   [`crate::output::DocumentReport`]; the diagram stays in the book as its
//!   original fenced source.
//!
//! Typesetter failures are neither: they are reported as an
//! [`crate::pipeline::assemble::InvocationOutcome`] value so the PDF engine
//! fallback can move on to the next engine.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the md2book library.
#[derive(Debug, Error)]
pub enum BookError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The working directory does not exist or is not a directory.
    #[error("Working directory not found: '{path}'")]
    WorkingDirNotFound { path: PathBuf },

    /// The directory listing could not be read.
    #[error("Failed to list '{path}': {source}")]
    ReadDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A chapter file does not start with an integer prefix (strict ordering).
    #[error("Chapter file '{name}' must start with a number followed by '.' (e.g. '3.md'): {reason}")]
    InvalidChapterName { name: String, reason: String },

    /// The working directory contains no Markdown chapters.
    #[error("No Markdown files found in '{path}'")]
    NoSourceDocuments { path: PathBuf },

    /// A chapter file could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// A working copy could not be written.
    #[error("Failed to write '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// At least one requested artifact was not produced.
    ///
    /// Returned by [`crate::output::BuildReport::into_result`] when the
    /// caller wants to treat a failed EPUB/PDF as an error.
    #[error("{failed}/{total} artifacts failed to build")]
    ArtifactsFailed { failed: usize, total: usize },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A non-fatal error for a single diagram block.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum DiagramError {
    /// The renderer ran and exited non-zero.
    #[error("{document} diagram {index}: renderer exited with {status:?}: {stderr}")]
    RenderFailed {
        document: String,
        index: usize,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The renderer could not be started at all.
    #[error("{document} diagram {index}: failed to run '{program}': {detail}")]
    RendererSpawnFailed {
        document: String,
        index: usize,
        program: String,
        detail: String,
    },

    /// The temporary diagram source file could not be created or written.
    #[error("{document} diagram {index}: scratch file: {detail}")]
    ScratchFileFailed {
        document: String,
        index: usize,
        detail: String,
    },
}

impl DiagramError {
    /// Ordinal of the failed block within its document.
    pub fn index(&self) -> usize {
        match self {
            DiagramError::RenderFailed { index, .. }
            | DiagramError::RendererSpawnFailed { index, .. }
            | DiagramError::ScratchFileFailed { index, .. } => *index,
        }
    }
}
