//! Diagram rendering through an external Mermaid CLI.
//!
//! md2book never draws diagrams itself. Each block is written to a scratch
//! `.mmd` file and handed to `mmdc` (or `mermaid-cli`), which writes a PNG:
//!
//! ```text
//! <renderer> -i <input> -o <output> -b transparent -s 2 --pdfFit true
//! ```
//!
//! The renderer sits behind [`DiagramRenderer`] so callers and tests can
//! supply their own.

use crate::error::DiagramError;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Renders one diagram source file into one image file.
pub trait DiagramRenderer: Send + Sync {
    /// Human-readable name for logs (usually the executable path).
    fn name(&self) -> String;

    /// Render `input` into `output`.
    ///
    /// `document` and `index` identify the block in error values.
    fn render(
        &self,
        input: &Path,
        output: &Path,
        document: &str,
        index: usize,
    ) -> Result<(), DiagramError>;
}

/// The Mermaid command-line renderer.
#[derive(Debug, Clone)]
pub struct MermaidCli {
    program: PathBuf,
}

impl MermaidCli {
    /// Use a specific executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Probe `candidates` on `PATH`; the first one found wins.
    pub fn discover<S: AsRef<str>>(candidates: &[S]) -> Option<Self> {
        candidates.iter().find_map(|name| {
            let found = which::which(name.as_ref()).ok()?;
            debug!("Found diagram renderer '{}' at {}", name.as_ref(), found.display());
            Some(Self::new(found))
        })
    }

    /// Arguments passed to the renderer for one diagram.
    pub fn args(input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            input.display().to_string(),
            "-o".to_string(),
            output.display().to_string(),
            "-b".to_string(),
            "transparent".to_string(),
            "-s".to_string(),
            "2".to_string(),
            "--pdfFit".to_string(),
            "true".to_string(),
        ]
    }
}

impl DiagramRenderer for MermaidCli {
    fn name(&self) -> String {
        self.program.display().to_string()
    }

    fn render(
        &self,
        input: &Path,
        output: &Path,
        document: &str,
        index: usize,
    ) -> Result<(), DiagramError> {
        let result = Command::new(&self.program)
            .args(Self::args(input, output))
            .output()
            .map_err(|e| DiagramError::RendererSpawnFailed {
                document: document.to_string(),
                index,
                program: self.name(),
                detail: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&result.stdout).into_owned();
        debug!("Renderer output for {} diagram {}: {}", document, index, stdout);

        if result.status.success() {
            Ok(())
        } else {
            Err(DiagramError::RenderFailed {
                document: document.to_string(),
                index,
                status: result.status.code(),
                stdout,
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            })
        }
    }
}

/// Pick the renderer for a build: the injected one, else the first
/// candidate found on `PATH`, else `None` (diagrams stay as source).
pub fn resolve_renderer<S: AsRef<str>>(
    injected: Option<&Arc<dyn DiagramRenderer>>,
    candidates: &[S],
) -> Option<Arc<dyn DiagramRenderer>> {
    if let Some(renderer) = injected {
        return Some(Arc::clone(renderer));
    }
    match MermaidCli::discover(candidates) {
        Some(cli) => {
            info!("Using diagram renderer: {}", cli.name());
            Some(Arc::new(cli))
        }
        None => {
            warn!(
                "No diagram renderer found (tried: {}). Skipping diagram conversion.",
                candidates
                    .iter()
                    .map(|c| c.as_ref())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            None
        }
    }
}
