//! Full-book build entry point.
//!
//! [`build`] runs the four stages once, top to bottom:
//! collect chapters → preprocess diagrams → typeset artifacts → clean up.
//! Only problems with the input itself (bad directory, a chapter name that
//! breaks the strict rule, unreadable or unwritable files) abort the build.
//! Diagram and typesetter failures are logged and recorded in the returned
//! [`BuildReport`].

use crate::config::{BuildConfig, OutputTarget, WORKING_COPY_PREFIX};
use crate::error::BookError;
use crate::output::{BuildReport, BuildStats, DocumentReport};
use crate::pipeline::cleanup::ScratchFiles;
use crate::pipeline::{assemble, collect, extract, preprocess, render};
use std::time::Instant;
use tracing::{info, warn};

/// Build the book described by `config`.
///
/// # Returns
/// `Ok(BuildReport)` whenever every chapter could be read and staged, even
/// if some diagrams or artifacts failed (check `report.artifacts`).
///
/// # Errors
/// - [`BookError::WorkingDirNotFound`] / [`BookError::ReadDirFailed`]
/// - [`BookError::InvalidChapterName`] under strict ordering
/// - [`BookError::NoSourceDocuments`]
/// - [`BookError::ReadFailed`] / [`BookError::WriteFailed`]
///
/// Intermediate files are removed on every path, including these errors,
/// unless `keep_intermediates` is set.
pub fn build(config: &BuildConfig) -> Result<BuildReport, BookError> {
    let total_start = Instant::now();

    // ── Step 1: Resolve the working directory ────────────────────────────
    let root = config
        .work_dir
        .canonicalize()
        .map_err(|_| BookError::WorkingDirNotFound {
            path: config.work_dir.clone(),
        })?;
    let mut config = config.clone();
    config.work_dir = root.clone();
    info!("Building {:?} book in {}", config.profile, root.display());

    // ── Step 2: Collect chapters ─────────────────────────────────────────
    let sources = collect::collect_sources(&root, &config.ordering)?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_build_start(sources.len());
    }

    // ── Step 3: Preprocess diagrams into working copies ──────────────────
    let renderer = render::resolve_renderer(config.renderer.as_ref(), &config.renderer_candidates);
    let mut scratch = if config.keep_intermediates {
        ScratchFiles::keeping()
    } else {
        ScratchFiles::new()
    };

    let mut documents = Vec::with_capacity(sources.len());
    let mut inputs = Vec::with_capacity(sources.len());

    for (position, source) in sources.iter().enumerate() {
        info!("Processing file: {}", source.name);
        if let Some(ref cb) = config.progress_callback {
            cb.on_document_start(&source.name, position + 1, sources.len());
        }

        let text = std::fs::read_to_string(&source.path).map_err(|e| BookError::ReadFailed {
            path: source.path.clone(),
            source: e,
        })?;

        // A renderer may write the image and still exit non-zero, so every
        // block's image path is tracked before rendering starts.
        if renderer.is_some() {
            for block in extract::extract_blocks(&text, &config.diagram_language) {
                scratch.track(preprocess::image_path(&root, &source.name, block.index));
            }
        }
        let processed = preprocess::preprocess_document(
            &text,
            &source.name,
            renderer.as_deref(),
            &root,
            &config,
        );

        let copy_name = format!("{}{}", WORKING_COPY_PREFIX, source.name);
        let copy_path = root.join(&copy_name);
        scratch.track(&copy_path);
        std::fs::write(&copy_path, &processed.text).map_err(|e| BookError::WriteFailed {
            path: copy_path.clone(),
            source: e,
        })?;
        inputs.push(copy_name);

        if let Some(ref cb) = config.progress_callback {
            cb.on_document_complete(&source.name, processed.images.len());
        }

        let (chapter_title, sections) = collect::chapter_info(&text);
        documents.push(DocumentReport {
            name: source.name.clone(),
            chapter_title,
            sections,
            diagrams_found: processed.blocks_found,
            diagrams_rendered: processed.images.len(),
            errors: processed.failures,
        });
    }

    // ── Step 4: Typeset each artifact ────────────────────────────────────
    let citations = assemble::citation_options(&config, &root);
    let typesetter = assemble::resolve_typesetter(&config);

    let mut artifacts = Vec::with_capacity(config.targets.len());
    for &target in &config.targets {
        if let Some(ref cb) = config.progress_callback {
            cb.on_artifact_start(target);
        }
        let report = match target {
            OutputTarget::Epub => {
                assemble::build_epub(typesetter.as_ref(), &config, &citations, &inputs)
            }
            OutputTarget::Pdf => {
                assemble::build_pdf(typesetter.as_ref(), &config, &citations, &inputs)
            }
        };
        if !report.status.is_built() {
            warn!("{} was not produced: {:?}", target, report.status);
        }
        if let Some(ref cb) = config.progress_callback {
            cb.on_artifact_complete(target, report.status.is_built());
        }
        artifacts.push(report);
    }

    // ── Step 5: Clean up ─────────────────────────────────────────────────
    scratch.cleanup();

    let diagrams_found: usize = documents.iter().map(|d| d.diagrams_found).sum();
    let diagrams_rendered: usize = documents.iter().map(|d| d.diagrams_rendered).sum();
    let stats = BuildStats {
        documents: documents.len(),
        diagrams_found,
        diagrams_rendered,
        diagrams_failed: documents.iter().map(|d| d.errors.len()).sum(),
        renderer_available: renderer.is_some(),
        citations: !citations.is_empty(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Build complete: {} chapters, {}/{} diagrams, {}/{} artifacts, {}ms",
        stats.documents,
        stats.diagrams_rendered,
        stats.diagrams_found,
        artifacts.iter().filter(|a| a.status.is_built()).count(),
        artifacts.len(),
        stats.total_duration_ms
    );

    Ok(BuildReport {
        profile: config.profile,
        documents,
        artifacts,
        stats,
    })
}
