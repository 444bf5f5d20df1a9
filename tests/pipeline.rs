//! Whole-pipeline tests over a temporary book directory.
//!
//! External tools are replaced by in-process fakes, so these run everywhere:
//! `FakeRenderer` writes a stub PNG (or fails when the diagram source
//! contains `FAIL`), `FakeTypesetter` records each invocation along with the
//! working copies it was handed and replies from a script.

use md2book::{
    build, ArtifactStatus, BookError, BuildConfig, BuildProfile, BuildProgressCallback,
    DiagramError, DiagramRenderer, InvocationOutcome, OutputTarget, Typesetter,
};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ── Fakes ────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeRenderer {
    calls: Mutex<usize>,
}

impl DiagramRenderer for FakeRenderer {
    fn name(&self) -> String {
        "fake-mmdc".into()
    }

    fn render(
        &self,
        input: &Path,
        output: &Path,
        document: &str,
        index: usize,
    ) -> Result<(), DiagramError> {
        *self.calls.lock().unwrap() += 1;
        let source = std::fs::read_to_string(input).unwrap();
        // Writes a partial image, then reports failure.
        if source.contains("CRASH") {
            std::fs::write(output, b"\x89PNG").unwrap();
            return Err(DiagramError::RenderFailed {
                document: document.into(),
                index,
                status: Some(1),
                stdout: "Generating single mermaid chart".into(),
                stderr: "Error: Evaluation failed".into(),
            });
        }
        if source.contains("FAIL") {
            return Err(DiagramError::RenderFailed {
                document: document.into(),
                index,
                status: Some(1),
                stdout: String::new(),
                stderr: "Parse error on line 2".into(),
            });
        }
        std::fs::write(output, b"\x89PNG\r\n").unwrap();
        Ok(())
    }
}

/// One recorded typesetter call.
#[derive(Debug, Clone)]
struct Invocation {
    args: Vec<String>,
    work_dir: PathBuf,
    /// Contents of every `_md2book_*` input at call time, in argument order.
    inputs: Vec<(String, String)>,
    /// Rendered images present at call time.
    images: Vec<PathBuf>,
}

struct FakeTypesetter {
    script: Mutex<VecDeque<InvocationOutcome>>,
    calls: Mutex<Vec<Invocation>>,
}

impl FakeTypesetter {
    /// Replies with `script` in order, then succeeds.
    fn scripted(script: Vec<InvocationOutcome>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn succeeding() -> Arc<Self> {
        Self::scripted(vec![])
    }

    fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

impl Typesetter for FakeTypesetter {
    fn name(&self) -> String {
        "fake-pandoc".into()
    }

    fn run(&self, args: &[String], work_dir: &Path) -> InvocationOutcome {
        let inputs = args
            .iter()
            .filter(|a| a.starts_with("_md2book_"))
            .map(|a| {
                let text = std::fs::read_to_string(work_dir.join(a)).unwrap_or_default();
                (a.clone(), text)
            })
            .collect();
        self.calls.lock().unwrap().push(Invocation {
            args: args.to_vec(),
            work_dir: work_dir.to_path_buf(),
            inputs,
            images: pngs(work_dir),
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(InvocationOutcome::Succeeded {
                stdout: String::new(),
            })
    }
}

#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
}

impl BuildProgressCallback for EventLog {
    fn on_build_start(&self, total_documents: usize) {
        self.events.lock().unwrap().push(format!("start {total_documents}"));
    }
    fn on_diagram_failed(&self, document: &str, index: usize, _error: &str) {
        self.events.lock().unwrap().push(format!("fail {document}#{index}"));
    }
    fn on_document_complete(&self, name: &str, diagrams_rendered: usize) {
        self.events.lock().unwrap().push(format!("done {name} {diagrams_rendered}"));
    }
    fn on_artifact_complete(&self, target: OutputTarget, success: bool) {
        self.events.lock().unwrap().push(format!("{target} {success}"));
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Route library logs through the test harness (`RUST_LOG=md2book=debug`).
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn book(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, text) in files {
        std::fs::write(dir.path().join(name), text).unwrap();
    }
    dir
}

fn fence(body: &str) -> String {
    format!("```mermaid\n{body}\n```")
}

fn pngs(dir: &Path) -> Vec<PathBuf> {
    let mut v: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("png"))
        .collect();
    v.sort();
    v
}

fn listing(dir: &Path) -> Vec<String> {
    let mut v: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    v.sort();
    v
}

fn config(
    dir: &Path,
    profile: BuildProfile,
    renderer: Option<Arc<FakeRenderer>>,
    typesetter: Arc<FakeTypesetter>,
) -> BuildConfig {
    init_logging();
    let mut builder = BuildConfig::builder()
        .work_dir(dir)
        .profile(profile)
        .typesetter(typesetter);
    match renderer {
        Some(r) => builder = builder.renderer(r),
        // A candidate that cannot exist on PATH.
        None => builder = builder.renderer_candidates(vec!["md2book-no-such-renderer".into()]),
    }
    builder.build().unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn partial_render_failure_keeps_failed_block_as_source() {
    let bad = fence("graph TD\n  FAIL -->");
    let chapter = format!(
        "# Boot\n\n{}\n\n{}\n\n{}\n",
        fence("%% Title: Power-on sequence\nsequenceDiagram\n  A->>B: reset"),
        bad,
        fence("pie\n  title Flash usage\n  \"code\" : 70"),
    );
    let dir = book(&[("1.md", &chapter)]);
    let renderer = Arc::new(FakeRenderer::default());
    let typesetter = FakeTypesetter::succeeding();
    let cfg = config(dir.path(), BuildProfile::PdfOnly, Some(renderer.clone()), typesetter.clone());

    let report = build(&cfg).unwrap();

    assert_eq!(*renderer.calls.lock().unwrap(), 3);
    let doc = &report.documents[0];
    assert_eq!(doc.diagrams_found, 3);
    assert_eq!(doc.diagrams_rendered, 2);
    assert_eq!(doc.errors.len(), 1);
    assert_eq!(doc.errors[0].index(), 1);

    let calls = typesetter.calls();
    let (_, staged) = &calls[0].inputs[0];
    assert!(staged.contains("![Power-on sequence](<"));
    assert!(staged.contains("mermaid_diagram_1.md_0.png>)"));
    assert!(staged.contains("![Flash usage](<"));
    assert!(staged.contains("mermaid_diagram_1.md_2.png>)"));
    assert!(staged.contains(&bad));
    assert_eq!(calls[0].images.len(), 2);
}

#[test]
fn missing_renderer_passes_text_through() {
    let chapter = format!("# One\n\n{}\n", fence("flowchart LR\n  A --> B"));
    let dir = book(&[("1.md", &chapter)]);
    let typesetter = FakeTypesetter::succeeding();
    let cfg = config(dir.path(), BuildProfile::Book, None, typesetter.clone());

    let report = build(&cfg).unwrap();

    assert!(!report.stats.renderer_available);
    assert_eq!(report.stats.diagrams_found, 1);
    assert_eq!(report.stats.diagrams_rendered, 0);
    for call in typesetter.calls() {
        assert_eq!(call.inputs[0].1, chapter);
    }
    // Both artifacts are still attempted.
    assert_eq!(report.artifacts.len(), 2);
    assert!(report.artifacts.iter().all(|a| a.status.is_built()));
}

#[test]
fn pdf_falls_back_to_second_engine() {
    let dir = book(&[("1.md", "# One\n")]);
    let typesetter = FakeTypesetter::scripted(vec![InvocationOutcome::Failed {
        status: Some(43),
        stdout: String::new(),
        stderr: "xelatex not found".into(),
    }]);
    let cfg = config(dir.path(), BuildProfile::PdfOnly, None, typesetter.clone());

    let report = build(&cfg).unwrap();

    let calls = typesetter.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].args.contains(&"--pdf-engine=xelatex".to_string()));
    assert!(calls[1].args.contains(&"--pdf-engine=pdflatex".to_string()));
    assert_eq!(
        report.artifacts[0].status,
        ArtifactStatus::Built {
            engine: Some("pdflatex".into())
        }
    );
}

#[test]
fn all_engines_failing_is_reported_not_raised() {
    let dir = book(&[("1.md", "# One\n")]);
    let failed = || InvocationOutcome::Failed {
        status: Some(1),
        stdout: "This is XeTeX, Version 3.141592653".into(),
        stderr: "! Undefined control sequence.".into(),
    };
    let typesetter = FakeTypesetter::scripted(vec![failed(), failed()]);
    let cfg = config(dir.path(), BuildProfile::PdfOnly, None, typesetter.clone());

    let report = build(&cfg).unwrap();

    assert_eq!(
        report.artifacts[0].status,
        ArtifactStatus::Failed {
            attempts: 2,
            last_error: Some("! Undefined control sequence.".into()),
        }
    );
    assert!(matches!(
        report.into_result(),
        Err(BookError::ArtifactsFailed { failed: 1, total: 1 })
    ));
}

#[test]
fn missing_typesetter_skips_remaining_engines() {
    let dir = book(&[("1.md", "# One\n")]);
    let typesetter = FakeTypesetter::scripted(vec![
        InvocationOutcome::ToolNotFound {
            program: "pandoc".into(),
        },
        InvocationOutcome::ToolNotFound {
            program: "pandoc".into(),
        },
    ]);
    let cfg = config(dir.path(), BuildProfile::Book, None, typesetter.clone());

    let report = build(&cfg).unwrap();

    // One EPUB call, one PDF call; pdflatex is never tried.
    assert_eq!(typesetter.calls().len(), 2);
    for artifact in &report.artifacts {
        assert_eq!(
            artifact.status,
            ArtifactStatus::ToolMissing {
                program: "pandoc".into()
            }
        );
    }
}

#[test]
fn intermediates_are_removed_after_build() {
    let chapter = format!("# One\n\n{}\n", fence("pie\n  \"a\" : 1"));
    let dir = book(&[("1.md", &chapter), ("2.md", "# Two\n")]);
    let before = listing(dir.path());
    let typesetter = FakeTypesetter::succeeding();
    let cfg = config(
        dir.path(),
        BuildProfile::Book,
        Some(Arc::new(FakeRenderer::default())),
        typesetter.clone(),
    );

    build(&cfg).unwrap();

    // Everything existed while the typesetter ran…
    let call = &typesetter.calls()[0];
    assert_eq!(call.inputs.len(), 2);
    assert_eq!(call.images.len(), 1);
    // …and nothing is left afterwards.
    assert_eq!(listing(dir.path()), before);
}

#[test]
fn image_from_failed_render_is_removed() {
    let chapter = format!(
        "# One\n\n{}\n\n{}\n",
        fence("graph TD\n  CRASH"),
        fence("pie\n  \"a\" : 1")
    );
    let dir = book(&[("1.md", &chapter)]);
    let before = listing(dir.path());
    let cfg = config(
        dir.path(),
        BuildProfile::PdfOnly,
        Some(Arc::new(FakeRenderer::default())),
        FakeTypesetter::succeeding(),
    );

    let report = build(&cfg).unwrap();

    assert_eq!(report.documents[0].errors.len(), 1);
    assert_eq!(report.documents[0].diagrams_rendered, 1);
    assert_eq!(listing(dir.path()), before);
}

#[test]
fn keep_intermediates_leaves_files() {
    let chapter = format!("# One\n\n{}\n", fence("pie\n  \"a\" : 1"));
    let dir = book(&[("1.md", &chapter)]);
    let cfg = BuildConfig::builder()
        .work_dir(dir.path())
        .renderer(Arc::new(FakeRenderer::default()))
        .typesetter(FakeTypesetter::succeeding())
        .keep_intermediates(true)
        .build()
        .unwrap();

    build(&cfg).unwrap();

    let names = listing(dir.path());
    assert!(names.contains(&"_md2book_1.md".to_string()));
    assert!(names.contains(&"mermaid_diagram_1.md_0.png".to_string()));
    assert!(!names.iter().any(|n| n.ends_with(".mmd")));
}

#[test]
fn strict_ordering_rejects_unnumbered_chapter() {
    let dir = book(&[("1.md", "# One\n"), ("intro.md", "# Intro\n")]);
    let typesetter = FakeTypesetter::succeeding();
    let cfg = config(dir.path(), BuildProfile::Book, None, typesetter.clone());

    let err = build(&cfg).unwrap_err();

    assert!(matches!(err, BookError::InvalidChapterName { ref name, .. } if name == "intro.md"));
    assert!(typesetter.calls().is_empty());
}

#[test]
fn strict_ordering_is_numeric() {
    let dir = book(&[("10.md", "# Ten\n"), ("2.md", "# Two\n"), ("1.md", "# One\n")]);
    let typesetter = FakeTypesetter::succeeding();
    let cfg = config(dir.path(), BuildProfile::Book, None, typesetter.clone());

    let report = build(&cfg).unwrap();

    let names: Vec<&str> = report.documents.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["1.md", "2.md", "10.md"]);
    let staged: Vec<String> = typesetter.calls()[0]
        .inputs
        .iter()
        .map(|(n, _)| n.clone())
        .collect();
    assert_eq!(staged, ["_md2book_1.md", "_md2book_2.md", "_md2book_10.md"]);
}

#[test]
fn lenient_ordering_puts_references_last() {
    let dir = book(&[
        ("References.md", "# References\n"),
        ("2.md", "# Two\n"),
        ("glossary.md", "# Glossary\n"),
        ("1.md", "# One\n"),
    ]);
    let typesetter = FakeTypesetter::succeeding();
    let cfg = config(dir.path(), BuildProfile::PdfOnly, None, typesetter.clone());

    let report = build(&cfg).unwrap();

    let names: Vec<&str> = report.documents.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["1.md", "2.md", "glossary.md", "References.md"]);
    assert_eq!(report.artifacts.len(), 1);
    assert_eq!(report.artifacts[0].target, OutputTarget::Pdf);
}

#[test]
fn empty_directory_is_an_error() {
    let dir = book(&[("notes.txt", "not a chapter")]);
    let cfg = config(dir.path(), BuildProfile::PdfOnly, None, FakeTypesetter::succeeding());
    assert!(matches!(build(&cfg), Err(BookError::NoSourceDocuments { .. })));
}

#[test]
fn missing_directory_is_an_error() {
    let dir = TempDir::new().unwrap();
    let cfg = config(
        &dir.path().join("absent"),
        BuildProfile::Book,
        None,
        FakeTypesetter::succeeding(),
    );
    assert!(matches!(build(&cfg), Err(BookError::WorkingDirNotFound { .. })));
}

#[test]
fn bibliography_enables_citations_for_every_artifact() {
    let dir = book(&[("1.md", "# One\n\nSee [@knuth84].\n"), ("references.bib", "@book{knuth84}")]);
    let typesetter = FakeTypesetter::succeeding();
    let cfg = config(dir.path(), BuildProfile::Book, None, typesetter.clone());

    let report = build(&cfg).unwrap();

    assert!(report.stats.citations);
    for call in typesetter.calls() {
        assert!(call.args.contains(&"--citeproc".to_string()));
        assert!(call.args.contains(&"--bibliography=references.bib".to_string()));
    }
}

#[test]
fn typesetter_runs_in_the_book_directory() {
    let dir = book(&[("1.md", "# One\n")]);
    let typesetter = FakeTypesetter::succeeding();
    let cfg = config(dir.path(), BuildProfile::PdfOnly, None, typesetter.clone());

    let report = build(&cfg).unwrap();

    let root = dir.path().canonicalize().unwrap();
    assert_eq!(typesetter.calls()[0].work_dir, root);
    assert_eq!(report.artifacts[0].path, root.join("output.pdf"));
}

#[test]
fn report_lists_chapter_headings_and_serialises() {
    let dir = book(&[(
        "1.md",
        "# Getting Started\n\n## Toolchain\n\ntext\n\n## First Blink\n",
    )]);
    let cfg = config(dir.path(), BuildProfile::PdfOnly, None, FakeTypesetter::succeeding());

    let report = build(&cfg).unwrap();

    let doc = &report.documents[0];
    assert_eq!(doc.chapter_title, "Getting Started");
    assert_eq!(doc.sections, ["Toolchain", "First Blink"]);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["documents"][0]["chapter_title"], "Getting Started");
    assert_eq!(json["profile"], "PdfOnly");
}

#[test]
fn progress_events_arrive_in_order() {
    let chapter = format!("# One\n\n{}\n\n{}\n", fence("pie\n  \"a\" : 1"), fence("graph TD\n  FAIL"));
    let dir = book(&[("1.md", &chapter)]);
    let log = Arc::new(EventLog::default());
    let cfg = BuildConfig::builder()
        .work_dir(dir.path())
        .profile(BuildProfile::PdfOnly)
        .renderer(Arc::new(FakeRenderer::default()))
        .typesetter(FakeTypesetter::succeeding())
        .progress_callback(log.clone())
        .build()
        .unwrap();

    build(&cfg).unwrap();

    assert_eq!(
        *log.events.lock().unwrap(),
        ["start 1", "fail 1.md#1", "done 1.md 1", "PDF true"]
    );
}
