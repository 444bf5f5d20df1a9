//! Removal of working copies and rendered images.
//!
//! [`ScratchFiles`] records every intermediate file as it is created and
//! deletes them all on [`ScratchFiles::cleanup`] or, failing that, when it is
//! dropped. A build that returns early with an error still leaves a clean
//! directory behind.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Intermediate files created during one build.
#[derive(Debug, Default)]
pub struct ScratchFiles {
    files: Vec<PathBuf>,
    keep: bool,
}

impl ScratchFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that never deletes anything (`keep_intermediates`).
    pub fn keeping() -> Self {
        Self {
            files: Vec::new(),
            keep: true,
        }
    }

    /// Record a file for removal.
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.files.push(path.into());
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.files
    }

    /// Delete every tracked file. Returns how many were removed.
    ///
    /// Missing files are skipped silently; a second call is a no-op.
    pub fn cleanup(&mut self) -> usize {
        if self.keep {
            if !self.files.is_empty() {
                info!("Keeping {} intermediate file(s)", self.files.len());
            }
            self.files.clear();
            return 0;
        }
        let removed = self
            .files
            .drain(..)
            .filter(|path| remove_quietly(path))
            .count();
        if removed > 0 {
            info!("Removed {} intermediate file(s)", removed);
        }
        removed
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn remove_quietly(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            debug!("Could not remove {}: {}", path.display(), e);
            false
        }
    }
}
