//! Configuration types for a book build.
//!
//! All build behaviour is controlled through [`BuildConfig`], built via its
//! [`BuildConfigBuilder`]. The two supported ways of building a book differ
//! only in data, so they are expressed as a [`BuildProfile`] that seeds the
//! ordering rule, the output targets and the PDF option set rather than as
//! two separate pipelines.

use crate::error::BookError;
use crate::pipeline::assemble::Typesetter;
use crate::pipeline::render::DiagramRenderer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Title written into the book metadata when none is configured.
pub const DEFAULT_TITLE: &str = "My Embedded Systems Book";

/// Prefix of the processed per-chapter copies handed to the typesetter.
pub const WORKING_COPY_PREFIX: &str = "_md2book_";

/// Configuration for a book build.
///
/// Built via [`BuildConfig::builder()`] or using [`BuildConfig::default()`].
///
/// # Example
/// ```rust
/// use md2book::{BuildConfig, BuildProfile};
///
/// let config = BuildConfig::builder()
///     .work_dir("manuscript")
///     .profile(BuildProfile::PdfOnly)
///     .title("Field Notes")
///     .build()
///     .unwrap();
/// assert_eq!(config.pdf_engines, vec!["xelatex", "pdflatex"]);
/// ```
#[derive(Clone)]
pub struct BuildConfig {
    /// Directory holding the chapter files. Outputs and scratch files are
    /// written here too. Default: `.`.
    pub work_dir: PathBuf,

    /// Which kind of book to build. Default: [`BuildProfile::Book`].
    pub profile: BuildProfile,

    /// How chapter files are ordered. Seeded from `profile`.
    pub ordering: OrderingRule,

    /// Artifacts to produce, in build order. Seeded from `profile`.
    pub targets: Vec<OutputTarget>,

    /// Layout variables for the PDF build. Seeded from `profile`.
    pub pdf_style: PdfStyle,

    /// Pass `--top-level-division=chapter` so each file opens a chapter.
    /// Seeded from `profile`.
    pub chapter_divisions: bool,

    /// Book title metadata. Default: [`DEFAULT_TITLE`].
    pub title: String,

    /// Info string of the fenced blocks treated as diagrams. Default: `mermaid`.
    pub diagram_language: String,

    /// Renderer executables probed on `PATH`, first hit wins.
    pub renderer_candidates: Vec<String>,

    /// Typesetter executable. Default: `pandoc`.
    pub pandoc_program: String,

    /// PDF engines tried in order until one succeeds.
    pub pdf_engines: Vec<String>,

    /// Bibliography file name looked up in `work_dir`. Default: `references.bib`.
    pub bibliography: String,

    /// EPUB output file name. Default: `output.epub`.
    pub epub_output: String,

    /// PDF output file name. Default: `output.pdf`.
    pub pdf_output: String,

    /// Leave working copies and rendered images on disk after the build.
    pub keep_intermediates: bool,

    /// Pre-constructed diagram renderer. Skips `PATH` discovery when set.
    pub renderer: Option<Arc<dyn DiagramRenderer>>,

    /// Pre-constructed typesetter. Defaults to running `pandoc_program`.
    pub typesetter: Option<Arc<dyn Typesetter>>,

    /// Receives per-document and per-artifact events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        let profile = BuildProfile::default();
        Self {
            work_dir: PathBuf::from("."),
            profile,
            ordering: profile.ordering(),
            targets: profile.targets(),
            pdf_style: profile.pdf_style(),
            chapter_divisions: profile.chapter_divisions(),
            title: DEFAULT_TITLE.to_string(),
            diagram_language: "mermaid".to_string(),
            renderer_candidates: vec!["mmdc".to_string(), "mermaid-cli".to_string()],
            pandoc_program: "pandoc".to_string(),
            pdf_engines: vec!["xelatex".to_string(), "pdflatex".to_string()],
            bibliography: "references.bib".to_string(),
            epub_output: "output.epub".to_string(),
            pdf_output: "output.pdf".to_string(),
            keep_intermediates: false,
            renderer: None,
            typesetter: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildConfig")
            .field("work_dir", &self.work_dir)
            .field("profile", &self.profile)
            .field("ordering", &self.ordering)
            .field("targets", &self.targets)
            .field("pdf_style", &self.pdf_style)
            .field("chapter_divisions", &self.chapter_divisions)
            .field("title", &self.title)
            .field("diagram_language", &self.diagram_language)
            .field("renderer_candidates", &self.renderer_candidates)
            .field("pandoc_program", &self.pandoc_program)
            .field("pdf_engines", &self.pdf_engines)
            .field("bibliography", &self.bibliography)
            .field("keep_intermediates", &self.keep_intermediates)
            .field("renderer", &self.renderer.as_ref().map(|_| "<dyn DiagramRenderer>"))
            .field("typesetter", &self.typesetter.as_ref().map(|_| "<dyn Typesetter>"))
            .finish()
    }
}

impl BuildConfig {
    /// Create a new builder for `BuildConfig`.
    pub fn builder() -> BuildConfigBuilder {
        BuildConfigBuilder {
            config: Self::default(),
        }
    }

    /// Absolute path of the output file for `target`.
    pub fn output_path(&self, target: OutputTarget) -> PathBuf {
        let name = match target {
            OutputTarget::Epub => &self.epub_output,
            OutputTarget::Pdf => &self.pdf_output,
        };
        self.work_dir.join(name)
    }
}

/// Builder for [`BuildConfig`].
#[derive(Debug)]
pub struct BuildConfigBuilder {
    config: BuildConfig,
}

impl BuildConfigBuilder {
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    /// Select a profile and reset every profile-derived field to its defaults.
    /// Call this before overriding `ordering`, `targets` or `pdf_style`.
    pub fn profile(mut self, profile: BuildProfile) -> Self {
        self.config.profile = profile;
        self.config.ordering = profile.ordering();
        self.config.targets = profile.targets();
        self.config.pdf_style = profile.pdf_style();
        self.config.chapter_divisions = profile.chapter_divisions();
        self
    }

    pub fn ordering(mut self, rule: OrderingRule) -> Self {
        self.config.ordering = rule;
        self
    }

    pub fn targets(mut self, targets: Vec<OutputTarget>) -> Self {
        self.config.targets = targets;
        self
    }

    pub fn pdf_style(mut self, style: PdfStyle) -> Self {
        self.config.pdf_style = style;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    pub fn diagram_language(mut self, lang: impl Into<String>) -> Self {
        self.config.diagram_language = lang.into();
        self
    }

    pub fn renderer_candidates(mut self, names: Vec<String>) -> Self {
        self.config.renderer_candidates = names;
        self
    }

    pub fn pandoc_program(mut self, program: impl Into<String>) -> Self {
        self.config.pandoc_program = program.into();
        self
    }

    pub fn pdf_engines(mut self, engines: Vec<String>) -> Self {
        self.config.pdf_engines = engines;
        self
    }

    pub fn bibliography(mut self, file_name: impl Into<String>) -> Self {
        self.config.bibliography = file_name.into();
        self
    }

    pub fn epub_output(mut self, file_name: impl Into<String>) -> Self {
        self.config.epub_output = file_name.into();
        self
    }

    pub fn pdf_output(mut self, file_name: impl Into<String>) -> Self {
        self.config.pdf_output = file_name.into();
        self
    }

    pub fn keep_intermediates(mut self, v: bool) -> Self {
        self.config.keep_intermediates = v;
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn DiagramRenderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    pub fn typesetter(mut self, typesetter: Arc<dyn Typesetter>) -> Self {
        self.config.typesetter = Some(typesetter);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BuildConfig, BookError> {
        let c = &self.config;
        if c.targets.is_empty() {
            return Err(BookError::InvalidConfig(
                "At least one output target is required".into(),
            ));
        }
        if c.targets.contains(&OutputTarget::Pdf) && c.pdf_engines.is_empty() {
            return Err(BookError::InvalidConfig(
                "PDF output needs at least one PDF engine".into(),
            ));
        }
        if c.diagram_language.trim().is_empty() {
            return Err(BookError::InvalidConfig(
                "Diagram language must not be empty".into(),
            ));
        }
        if c.epub_output.ends_with(".md") || c.pdf_output.ends_with(".md") {
            return Err(BookError::InvalidConfig(
                "Output files must not use the .md extension".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The kind of book being built.
///
/// | Profile | Outputs | Chapter naming |
/// |---------|---------|----------------|
/// | `Book` | EPUB + PDF | every file must be `<n>.md` |
/// | `PdfOnly` | PDF | numbered files first, others after, appendix last |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BuildProfile {
    /// EPUB and PDF with strict numeric chapter names. (default)
    #[default]
    Book,
    /// PDF only, report layout, tolerant of unnumbered files.
    PdfOnly,
}

impl BuildProfile {
    pub fn ordering(self) -> OrderingRule {
        match self {
            BuildProfile::Book => OrderingRule::Strict,
            BuildProfile::PdfOnly => OrderingRule::Lenient {
                appendix: Some("References.md".to_string()),
            },
        }
    }

    pub fn targets(self) -> Vec<OutputTarget> {
        match self {
            BuildProfile::Book => vec![OutputTarget::Epub, OutputTarget::Pdf],
            BuildProfile::PdfOnly => vec![OutputTarget::Pdf],
        }
    }

    pub fn pdf_style(self) -> PdfStyle {
        match self {
            BuildProfile::Book => PdfStyle::book(),
            BuildProfile::PdfOnly => PdfStyle::report(),
        }
    }

    pub fn chapter_divisions(self) -> bool {
        matches!(self, BuildProfile::Book)
    }
}

/// Rule used to order chapter files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderingRule {
    /// Sort by the integer before the first `.`; any other name is an error.
    Strict,
    /// Numbered files first, then the rest by name, then `appendix` last.
    Lenient { appendix: Option<String> },
}

/// An artifact the build can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputTarget {
    Epub,
    Pdf,
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Epub => f.write_str("EPUB"),
            OutputTarget::Pdf => f.write_str("PDF"),
        }
    }
}

/// LaTeX layout variables passed to the typesetter for PDF output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfStyle {
    /// `documentclass` variable, e.g. `report`.
    pub document_class: Option<String>,
    pub paper_size: String,
    /// Value of the `geometry` variable.
    pub geometry: String,
    pub class_option: String,
    pub font_size: Option<String>,
    /// Colour used for both internal links and URLs.
    pub link_color: Option<String>,
    pub page_style: Option<String>,
    /// Syntax highlighting of code blocks.
    pub highlight: bool,
    /// Image resolution hint.
    pub dpi: u32,
    /// Input format passed to `--from`.
    pub input_format: String,
}

impl PdfStyle {
    /// One-sided A4 with plain page style and no highlighting.
    pub fn book() -> Self {
        Self {
            document_class: None,
            paper_size: "a4paper".to_string(),
            geometry: "margin=2.5cm".to_string(),
            class_option: "oneside".to_string(),
            font_size: None,
            link_color: None,
            page_style: Some("plain".to_string()),
            highlight: false,
            dpi: 300,
            input_format: "markdown+lists_without_preceding_blankline".to_string(),
        }
    }

    /// Report class, 11pt, blue links.
    pub fn report() -> Self {
        Self {
            document_class: Some("report".to_string()),
            font_size: Some("11pt".to_string()),
            link_color: Some("blue".to_string()),
            page_style: None,
            highlight: true,
            ..Self::book()
        }
    }
}
