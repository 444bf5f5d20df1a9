//! CLI binary for md2book.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `BuildConfig` and prints the build report.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use md2book::{
    build, ArtifactStatus, BuildConfig, BuildProfile, BuildProgressCallback, BuildReport,
    OutputTarget, ProgressCallback,
};
use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Terminal progress callback: one bar over the chapters, then a spinner
/// per artifact while the typesetter runs.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Diagrams that failed in the current chapter.
    chapter_failures: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Collecting chapters…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            chapter_failures: AtomicUsize::new(0),
        })
    }
}

impl BuildProgressCallback for CliProgressCallback {
    fn on_build_start(&self, total_documents: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} chapters  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_documents as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Preprocessing");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Building {total_documents} chapters…"))
        ));
    }

    fn on_document_start(&self, name: &str, _position: usize, _total: usize) {
        self.chapter_failures.store(0, Ordering::SeqCst);
        self.bar.set_message(name.to_string());
    }

    fn on_diagram_failed(&self, document: &str, index: usize, error: &str) {
        self.chapter_failures.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {} diagram {}  {}",
            red("✗"),
            document,
            index,
            red(&msg)
        ));
    }

    fn on_document_complete(&self, name: &str, diagrams_rendered: usize) {
        let failed = self.chapter_failures.load(Ordering::SeqCst);
        let mark = if failed == 0 { green("✓") } else { cyan("⚠") };
        self.bar.println(format!(
            "  {} {:<24}  {}",
            mark,
            name,
            dim(&format!("{diagrams_rendered} diagram(s)")),
        ));
        self.bar.inc(1);
    }

    fn on_artifact_start(&self, target: OutputTarget) {
        self.bar.set_prefix("Typesetting");
        self.bar.set_message(target.to_string());
    }

    fn on_artifact_complete(&self, target: OutputTarget, success: bool) {
        let mark = if success { green("✓") } else { red("✗") };
        self.bar.println(format!("  {} {}", mark, target));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Build output.epub and output.pdf from 1.md, 2.md, … in the current directory
  md2book

  # Build a report-style PDF from a directory with a References.md appendix
  md2book --profile pdf manuscript/

  # Custom title, LuaLaTeX first
  md2book --title "Firmware Field Guide" --pdf-engine lualatex --pdf-engine xelatex

  # Keep the processed chapters and diagram images for inspection
  md2book --keep-intermediates -v

  # Machine-readable report; non-zero exit if an artifact failed
  md2book --json --fail-on-error > report.json

PROFILES:
  book   every chapter named <n>.md; EPUB + PDF; one-sided A4, plain pages
  pdf    numbered chapters first, other files after, References.md last;
         PDF only; report class, 11pt, blue links

EXTERNAL TOOLS:
  mmdc / mermaid-cli   renders ```mermaid blocks; skipped with a warning if absent
  pandoc               assembles the book
  xelatex, pdflatex    PDF engines, tried in order

ENVIRONMENT VARIABLES:
  RUST_LOG             Override the log filter (e.g. md2book=debug)
  MD2BOOK_*            Every flag has an env fallback, e.g. MD2BOOK_TITLE
"#;

/// Build an EPUB and/or PDF book from a directory of Markdown chapters.
#[derive(Parser, Debug)]
#[command(
    name = "md2book",
    version,
    about = "Build an EPUB and/or PDF book from Markdown chapters",
    long_about = "Build an EPUB and/or PDF book from a directory of Markdown chapters. \
Mermaid diagrams are rendered to images with mermaid-cli, then pandoc assembles \
the chapters in order, falling back through LaTeX engines for the PDF.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory holding the chapter files.
    #[arg(env = "MD2BOOK_DIR", default_value = ".")]
    dir: PathBuf,

    /// Build profile: book (EPUB + PDF) or pdf (PDF only).
    #[arg(long, env = "MD2BOOK_PROFILE", value_enum, default_value = "book")]
    profile: ProfileArg,

    /// Book title metadata.
    #[arg(long, env = "MD2BOOK_TITLE")]
    title: Option<String>,

    /// Bibliography file name, looked up in DIR.
    #[arg(long, env = "MD2BOOK_BIBLIOGRAPHY")]
    bibliography: Option<String>,

    /// Typesetter executable.
    #[arg(long, env = "MD2BOOK_PANDOC")]
    pandoc: Option<String>,

    /// PDF engine to try; repeat to set the fallback order.
    #[arg(long = "pdf-engine", env = "MD2BOOK_PDF_ENGINES", value_delimiter = ',')]
    pdf_engines: Vec<String>,

    /// Leave processed chapters and diagram images on disk.
    #[arg(long, env = "MD2BOOK_KEEP_INTERMEDIATES")]
    keep_intermediates: bool,

    /// Print the build report as JSON on stdout.
    #[arg(long, env = "MD2BOOK_JSON")]
    json: bool,

    /// Exit non-zero when any artifact was not produced.
    #[arg(long, env = "MD2BOOK_FAIL_ON_ERROR")]
    fail_on_error: bool,

    /// Append logs to this file instead of stderr.
    #[arg(long, env = "MD2BOOK_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, env = "MD2BOOK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MD2BOOK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MD2BOOK_QUIET")]
    quiet: bool,
}

impl Cli {
    fn shows_progress(&self) -> bool {
        !self.quiet && !self.no_progress && !self.json
    }
}

/// Default log filter when `RUST_LOG` is unset.
///
/// A file sink gets INFO regardless of the progress bar. On stderr the bar
/// replaces INFO-level logs, but warnings (missing renderer, missing
/// bibliography) still get through.
fn log_filter(cli: &Cli) -> &'static str {
    if cli.verbose {
        "debug"
    } else if cli.log_file.is_some() {
        "info"
    } else if cli.quiet {
        "error"
    } else if cli.shows_progress() {
        "warn"
    } else {
        "info"
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ProfileArg {
    Book,
    Pdf,
}

impl From<ProfileArg> for BuildProfile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Book => BuildProfile::Book,
            ProfileArg::Pdf => BuildProfile::PdfOnly,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = cli.shows_progress();
    let filter = log_filter(&cli);

    let writer = match cli.log_file {
        Some(ref path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_ansi(cli.log_file.is_none())
        .with_writer(writer)
        .finish();
    // Dropped at the end of `main`, which detaches the sink.
    let _log_guard = tracing::subscriber::set_default(subscriber);

    // ── Build config ─────────────────────────────────────────────────────
    let progress = if show_progress {
        Some(CliProgressCallback::new())
    } else {
        None
    };
    let config = build_config(
        &cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn BuildProgressCallback>),
    )?;

    // ── Run build ────────────────────────────────────────────────────────
    let result = build(&config);
    if let Some(ref cb) = progress {
        cb.bar.finish_and_clear();
    }
    let report = result.with_context(|| format!("Build failed in {}", cli.dir.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report);
    }

    if cli.fail_on_error {
        report.into_result().context("Build incomplete")?;
    }
    Ok(())
}

/// Map CLI args to `BuildConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<BuildConfig> {
    let mut builder = BuildConfig::builder()
        .work_dir(&cli.dir)
        .profile(cli.profile.clone().into())
        .keep_intermediates(cli.keep_intermediates);

    if let Some(ref title) = cli.title {
        builder = builder.title(title);
    }
    if let Some(ref bib) = cli.bibliography {
        builder = builder.bibliography(bib);
    }
    if let Some(ref pandoc) = cli.pandoc {
        builder = builder.pandoc_program(pandoc);
    }
    if !cli.pdf_engines.is_empty() {
        builder = builder.pdf_engines(cli.pdf_engines.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Per-artifact lines plus one stats line, on stderr.
fn print_summary(report: &BuildReport) {
    for artifact in &report.artifacts {
        let path = bold(&artifact.path.display().to_string());
        match &artifact.status {
            ArtifactStatus::Built { engine: Some(engine) } => {
                eprintln!("{}  {}  →  {}  {}", green("✔"), artifact.target, path, dim(engine));
            }
            ArtifactStatus::Built { engine: None } => {
                eprintln!("{}  {}  →  {}", green("✔"), artifact.target, path);
            }
            ArtifactStatus::Failed { attempts, .. } => {
                eprintln!(
                    "{}  {}  failed after {} attempt(s)",
                    red("✘"),
                    artifact.target,
                    attempts
                );
            }
            ArtifactStatus::ToolMissing { program } => {
                eprintln!("{}  {}  skipped, {} not found", red("✘"), artifact.target, program);
            }
        }
    }

    let stats = &report.stats;
    eprintln!(
        "   {} chapters  /  {}/{} diagrams  —  {}ms total",
        dim(&stats.documents.to_string()),
        dim(&stats.diagrams_rendered.to_string()),
        stats.diagrams_found,
        stats.total_duration_ms,
    );
    if !stats.renderer_available && stats.diagrams_found > 0 {
        eprintln!("   {}", cyan("diagrams left as source: mermaid-cli not found"));
    }
}
