//! Build report types.
//!
//! A build that runs to completion always yields a [`BuildReport`], even when
//! diagrams or artifacts failed. Callers that want any failure to be an error
//! use [`BuildReport::into_result`].

use crate::config::{BuildProfile, OutputTarget};
use crate::error::{BookError, DiagramError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of a full build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub profile: BuildProfile,
    /// Chapters in book order.
    pub documents: Vec<DocumentReport>,
    /// One entry per requested target, in build order.
    pub artifacts: Vec<ArtifactReport>,
    pub stats: BuildStats,
}

impl BuildReport {
    /// Artifacts that were not produced.
    pub fn failed_artifacts(&self) -> impl Iterator<Item = &ArtifactReport> {
        self.artifacts.iter().filter(|a| !a.status.is_built())
    }

    /// `Ok(self)` if every artifact was built, else [`BookError::ArtifactsFailed`].
    pub fn into_result(self) -> Result<Self, BookError> {
        let failed = self.failed_artifacts().count();
        if failed == 0 {
            Ok(self)
        } else {
            Err(BookError::ArtifactsFailed {
                failed,
                total: self.artifacts.len(),
            })
        }
    }
}

/// What happened to one chapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    /// Chapter file name.
    pub name: String,
    /// First level-1 heading.
    pub chapter_title: String,
    /// Level-2 headings.
    pub sections: Vec<String>,
    pub diagrams_found: usize,
    pub diagrams_rendered: usize,
    /// Diagrams left as source text.
    pub errors: Vec<DiagramError>,
}

/// What happened to one output artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReport {
    pub target: OutputTarget,
    pub path: PathBuf,
    pub status: ArtifactStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactStatus {
    /// Written successfully; `engine` is the PDF engine that worked.
    Built { engine: Option<String> },
    /// The typesetter ran but no attempt succeeded.
    Failed {
        attempts: usize,
        last_error: Option<String>,
    },
    /// The typesetter executable was not found.
    ToolMissing { program: String },
}

impl ArtifactStatus {
    pub fn is_built(&self) -> bool {
        matches!(self, ArtifactStatus::Built { .. })
    }
}

/// Aggregate counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildStats {
    pub documents: usize,
    pub diagrams_found: usize,
    pub diagrams_rendered: usize,
    pub diagrams_failed: usize,
    /// `false` when no renderer was available.
    pub renderer_available: bool,
    /// `true` when the bibliography file was found.
    pub citations: bool,
    pub total_duration_ms: u64,
}
