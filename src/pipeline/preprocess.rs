//! Diagram preprocessing: replace diagram fences with rendered images.
//!
//! For every block found in a chapter:
//!
//! 1. derive its caption ([`super::caption`])
//! 2. write the block source to a scratch `.mmd` file next to the chapter
//! 3. ask the renderer for `mermaid_diagram_<file>_<n>.png`
//! 4. on success, swap the fence for `![caption](</abs/path.png>)`
//!
//! A failed render leaves that fence untouched and moves on; one broken
//! diagram never costs the rest of the chapter. The scratch file is a
//! [`tempfile::NamedTempFile`], removed when it goes out of scope on every
//! path.
//!
//! Substitution is textual. When the same fence appears verbatim twice in a
//! chapter, the first successful render replaces both occurrences.

use super::caption::derive_caption;
use super::extract::extract_blocks;
use super::render::DiagramRenderer;
use crate::config::{BuildConfig, WORKING_COPY_PREFIX};
use crate::error::DiagramError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// A rendered diagram and the caption it is embedded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// 0-based ordinal of the source block in its chapter.
    pub index: usize,
    /// Absolute path of the rendered image.
    pub path: PathBuf,
    pub caption: String,
}

impl ImageReference {
    /// Markdown image embed for this diagram.
    ///
    /// The destination is wrapped in `<…>` so directories containing spaces
    /// still parse as a single link target.
    pub fn markdown(&self) -> String {
        format!("![{}](<{}>)", self.caption, self.path.display())
    }
}

/// A chapter after preprocessing.
#[derive(Debug, Clone)]
pub struct PreprocessedDocument {
    /// Chapter text with every successfully rendered fence replaced.
    pub text: String,
    /// Number of diagram fences found.
    pub blocks_found: usize,
    /// Images written by the renderer.
    pub images: Vec<ImageReference>,
    /// Blocks left as source text.
    pub failures: Vec<DiagramError>,
}

impl PreprocessedDocument {
    fn unchanged(text: &str, blocks_found: usize) -> Self {
        Self {
            text: text.to_string(),
            blocks_found,
            images: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// Rendered image path for block `index` of `document`, inside `out_dir`.
pub fn image_path(out_dir: &Path, document: &str, index: usize) -> PathBuf {
    out_dir.join(format!("mermaid_diagram_{}_{}.png", document, index))
}

/// Replace every diagram fence in `text` with a rendered image reference.
///
/// # Arguments
/// * `text`     — chapter contents
/// * `document` — chapter file name, used in image names and logs
/// * `renderer` — `None` when no renderer is available; the text is then
///   returned unchanged
/// * `out_dir`  — absolute directory for scratch sources and images
/// * `config`   — supplies the diagram language and progress callback
pub fn preprocess_document(
    text: &str,
    document: &str,
    renderer: Option<&dyn DiagramRenderer>,
    out_dir: &Path,
    config: &BuildConfig,
) -> PreprocessedDocument {
    let blocks = extract_blocks(text, &config.diagram_language);

    let Some(renderer) = renderer else {
        if !blocks.is_empty() {
            warn!(
                "{}: leaving {} diagram(s) as source, no renderer available",
                document,
                blocks.len()
            );
        }
        return PreprocessedDocument::unchanged(text, blocks.len());
    };

    if blocks.is_empty() {
        info!("No diagrams found in {}", document);
        return PreprocessedDocument::unchanged(text, 0);
    }
    info!("Found {} diagram(s) in {}", blocks.len(), document);

    let mut result = PreprocessedDocument::unchanged(text, blocks.len());

    for block in &blocks {
        debug!(
            "Diagram {} in {}:\n{}",
            block.index, document, block.source
        );
        let reference = ImageReference {
            index: block.index,
            path: image_path(out_dir, document, block.index),
            caption: derive_caption(&block.source),
        };

        match render_block(renderer, &block.source, &reference.path, out_dir, document, block.index) {
            Ok(()) => {
                if !reference.path.exists() {
                    warn!(
                        "Renderer reported success but {} is missing",
                        reference.path.display()
                    );
                }
                result.text = result.text.replace(&block.fenced, &reference.markdown());
                info!("Converted diagram {} in {}", block.index, document);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_diagram_rendered(document, block.index);
                }
                result.images.push(reference);
            }
            Err(e) => {
                match &e {
                    DiagramError::RenderFailed { stdout, stderr, .. } => {
                        error!("Failed to convert diagram {} in {}: {}", block.index, document, e);
                        error!("Renderer output: {}", stdout);
                        error!("Renderer error output: {}", stderr);
                    }
                    other => error!("Failed to convert diagram {} in {}: {}", block.index, document, other),
                }
                if let Some(ref cb) = config.progress_callback {
                    cb.on_diagram_failed(document, block.index, &e.to_string());
                }
                result.failures.push(e);
            }
        }
    }

    result
}

/// Write `source` to a scratch file and render it to `image`.
fn render_block(
    renderer: &dyn DiagramRenderer,
    source: &str,
    image: &Path,
    out_dir: &Path,
    document: &str,
    index: usize,
) -> Result<(), DiagramError> {
    let scratch_err = |e: std::io::Error| DiagramError::ScratchFileFailed {
        document: document.to_string(),
        index,
        detail: e.to_string(),
    };

    let prefix = format!("{}{}_{}_", WORKING_COPY_PREFIX, document, index);
    let mut scratch = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".mmd")
        .tempfile_in(out_dir)
        .map_err(scratch_err)?;
    scratch.write_all(source.as_bytes()).map_err(scratch_err)?;
    scratch.flush().map_err(scratch_err)?;

    // `scratch` is removed when dropped, whatever the outcome.
    renderer.render(scratch.path(), image, document, index)
}
