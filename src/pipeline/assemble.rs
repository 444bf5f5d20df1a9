//! Book assembly: hand the ordered working copies to the typesetter.
//!
//! The typesetter is pandoc. Each artifact is one invocation (EPUB) or a
//! sequence of invocations over the configured PDF engines, stopping at the
//! first that exits zero. A failure is never raised: every invocation yields
//! an [`InvocationOutcome`] and every artifact an
//! [`ArtifactReport`](crate::output::ArtifactReport).
//!
//! ## Argument layout
//!
//! ```text
//! EPUB: -o output.epub <common> <citations> <inputs…>
//! PDF:  -o output.pdf --pdf-engine=<e> <variables> --dpi=N --from <fmt>
//!       [--no-highlight] <citations> <common> <inputs…>
//! ```

use crate::config::{BuildConfig, OutputTarget};
use crate::output::{ArtifactReport, ArtifactStatus};
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of one typesetter invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// Exit status zero.
    Succeeded { stdout: String },
    /// The tool ran and reported failure.
    Failed {
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// The executable could not be found.
    ToolNotFound { program: String },
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationOutcome::Succeeded { .. })
    }
}

/// Runs the document typesetter.
pub trait Typesetter: Send + Sync {
    /// Executable name for logs.
    fn name(&self) -> String;

    /// Run with `args`, using `work_dir` as the current directory.
    fn run(&self, args: &[String], work_dir: &Path) -> InvocationOutcome;
}

/// The pandoc command-line typesetter.
#[derive(Debug, Clone)]
pub struct Pandoc {
    program: String,
}

impl Pandoc {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Typesetter for Pandoc {
    fn name(&self) -> String {
        self.program.clone()
    }

    fn run(&self, args: &[String], work_dir: &Path) -> InvocationOutcome {
        match Command::new(&self.program)
            .args(args)
            .current_dir(work_dir)
            .output()
        {
            Ok(out) if out.status.success() => InvocationOutcome::Succeeded {
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            },
            Ok(out) => InvocationOutcome::Failed {
                status: out.status.code(),
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => InvocationOutcome::ToolNotFound {
                program: self.program.clone(),
            },
            Err(e) => InvocationOutcome::Failed {
                status: None,
                stdout: String::new(),
                stderr: e.to_string(),
            },
        }
    }
}

/// The injected typesetter, or pandoc at `config.pandoc_program`.
pub fn resolve_typesetter(config: &BuildConfig) -> Arc<dyn Typesetter> {
    match config.typesetter {
        Some(ref t) => Arc::clone(t),
        None => Arc::new(Pandoc::new(config.pandoc_program.clone())),
    }
}

// ── Option sets ──────────────────────────────────────────────────────────

/// Options shared by every artifact.
pub fn common_options(config: &BuildConfig) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--toc".into(),
        "--toc-depth=2".into(),
        "--number-sections".into(),
    ];
    if config.chapter_divisions {
        args.push("--top-level-division=chapter".into());
    }
    args.push("--metadata".into());
    args.push(format!("title={}", config.title));
    args
}

/// Citation flags when the bibliography file exists in `work_dir`.
///
/// Without it citations stay as literal `[@key]` text in the output.
pub fn citation_options(config: &BuildConfig, work_dir: &Path) -> Vec<String> {
    if work_dir.join(&config.bibliography).is_file() {
        info!("Using bibliography {}", config.bibliography);
        vec![
            "--citeproc".into(),
            format!("--bibliography={}", config.bibliography),
        ]
    } else {
        warn!(
            "{} not found. Citations may not be processed correctly.",
            config.bibliography
        );
        Vec::new()
    }
}

/// Full argument list for the EPUB build.
pub fn epub_args(config: &BuildConfig, citations: &[String], inputs: &[String]) -> Vec<String> {
    let mut args = vec!["-o".to_string(), config.epub_output.clone()];
    args.extend(common_options(config));
    args.extend_from_slice(citations);
    args.extend_from_slice(inputs);
    args
}

/// Full argument list for one PDF attempt with `engine`.
pub fn pdf_args(
    config: &BuildConfig,
    engine: &str,
    citations: &[String],
    inputs: &[String],
) -> Vec<String> {
    let style = &config.pdf_style;
    let mut args = vec![
        "-o".to_string(),
        config.pdf_output.clone(),
        format!("--pdf-engine={}", engine),
    ];

    let mut variable = |key: &str, value: &str| {
        args.push("--variable".into());
        args.push(format!("{}={}", key, value));
    };
    if let Some(ref class) = style.document_class {
        variable("documentclass", class.as_str());
    }
    variable("papersize", style.paper_size.as_str());
    variable("geometry", style.geometry.as_str());
    variable("classoption", style.class_option.as_str());
    if let Some(ref size) = style.font_size {
        variable("fontsize", size.as_str());
    }
    if let Some(ref color) = style.link_color {
        variable("linkcolor", color.as_str());
        variable("urlcolor", color.as_str());
    }
    if let Some(ref page_style) = style.page_style {
        variable("pagestyle", page_style.as_str());
    }

    if !style.highlight {
        args.push("--no-highlight".into());
    }
    args.push(format!("--dpi={}", style.dpi));
    args.push("--from".into());
    args.push(style.input_format.clone());
    args.extend_from_slice(citations);
    args.extend(common_options(config));
    args.extend_from_slice(inputs);
    args
}

// ── Invocation ───────────────────────────────────────────────────────────

/// Log line for a failed invocation, carrying both captured streams.
pub fn failure_message(
    program: &str,
    label: &str,
    status: Option<i32>,
    stdout: &str,
    stderr: &str,
) -> String {
    format!(
        "{} error for {} (exit {:?})\nstdout: {}\nstderr: {}",
        program,
        label,
        status,
        stdout.trim_end(),
        stderr.trim_end()
    )
}

/// Run the typesetter once and log the outcome.
pub fn run_typesetter(
    typesetter: &dyn Typesetter,
    args: &[String],
    work_dir: &Path,
    label: &str,
) -> InvocationOutcome {
    info!(
        "Running {} for {}: {} {}",
        typesetter.name(),
        label,
        typesetter.name(),
        args.join(" ")
    );
    let outcome = typesetter.run(args, work_dir);
    match &outcome {
        InvocationOutcome::Succeeded { stdout } => {
            debug!("{} output: {}", typesetter.name(), stdout);
            info!("{} file created successfully.", label);
        }
        InvocationOutcome::Failed {
            status,
            stdout,
            stderr,
        } => {
            error!("{}", failure_message(&typesetter.name(), label, *status, stdout, stderr));
        }
        InvocationOutcome::ToolNotFound { program } => {
            error!(
                "Typesetter not found: '{}'. Please ensure it is installed and in your system PATH.",
                program
            );
        }
    }
    outcome
}

/// Build the EPUB artifact.
pub fn build_epub(
    typesetter: &dyn Typesetter,
    config: &BuildConfig,
    citations: &[String],
    inputs: &[String],
) -> ArtifactReport {
    let args = epub_args(config, citations, inputs);
    let outcome = run_typesetter(typesetter, &args, &config.work_dir, "EPUB");
    let status = match outcome {
        InvocationOutcome::Succeeded { .. } => ArtifactStatus::Built { engine: None },
        InvocationOutcome::Failed { stderr, .. } => ArtifactStatus::Failed {
            attempts: 1,
            last_error: Some(stderr),
        },
        InvocationOutcome::ToolNotFound { program } => ArtifactStatus::ToolMissing { program },
    };
    ArtifactReport {
        target: OutputTarget::Epub,
        path: config.output_path(OutputTarget::Epub),
        status,
    }
}

/// Build the PDF artifact, trying each configured engine in turn.
pub fn build_pdf(
    typesetter: &dyn Typesetter,
    config: &BuildConfig,
    citations: &[String],
    inputs: &[String],
) -> ArtifactReport {
    let mut attempts = 0;
    let mut last_error = None;

    for engine in &config.pdf_engines {
        attempts += 1;
        let args = pdf_args(config, engine, citations, inputs);
        let label = format!("PDF ({})", engine);
        match run_typesetter(typesetter, &args, &config.work_dir, &label) {
            InvocationOutcome::Succeeded { .. } => {
                return ArtifactReport {
                    target: OutputTarget::Pdf,
                    path: config.output_path(OutputTarget::Pdf),
                    status: ArtifactStatus::Built {
                        engine: Some(engine.clone()),
                    },
                };
            }
            InvocationOutcome::Failed { stderr, .. } => {
                last_error = Some(stderr);
            }
            // Every engine goes through the same executable.
            InvocationOutcome::ToolNotFound { program } => {
                return ArtifactReport {
                    target: OutputTarget::Pdf,
                    path: config.output_path(OutputTarget::Pdf),
                    status: ArtifactStatus::ToolMissing { program },
                };
            }
        }
    }

    error!(
        "PDF generation failed. No suitable PDF engine found (tried: {}).",
        config.pdf_engines.join(", ")
    );
    ArtifactReport {
        target: OutputTarget::Pdf,
        path: config.output_path(OutputTarget::Pdf),
        status: ArtifactStatus::Failed {
            attempts,
            last_error,
        },
    }
}
