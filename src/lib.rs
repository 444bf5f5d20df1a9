//! # md2book
//!
//! Turn a directory of Markdown chapters into an EPUB and/or a PDF book.
//!
//! Mermaid diagrams are pre-rendered to PNG with the Mermaid CLI (`mmdc`) and
//! embedded as captioned images, then pandoc assembles the chapters in order.
//! PDF builds fall back through a list of LaTeX engines until one succeeds.
//!
//! ## Pipeline Overview
//!
//! ```text
//! book/
//!  │
//!  ├─ 1. Collect     *.md chapters, ordered by their numeric name prefix
//!  ├─ 2. Preprocess  ```mermaid fences → mmdc → ![caption](<diagram.png>)
//!  ├─ 3. Assemble    pandoc → output.epub / output.pdf (xelatex → pdflatex)
//!  └─ 4. Cleanup     remove working copies and rendered images
//! ```
//!
//! Missing tools and failed diagrams degrade the build instead of aborting
//! it: every outcome is recorded in the returned [`BuildReport`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use md2book::{build, BuildConfig, BuildProfile};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BuildConfig::builder()
//!         .work_dir("book")
//!         .profile(BuildProfile::PdfOnly)
//!         .title("Firmware Field Guide")
//!         .build()?;
//!     let report = build(&config)?;
//!     for artifact in &report.artifacts {
//!         eprintln!("{}: {:?}", artifact.target, artifact.status);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2book` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Profiles
//!
//! | Profile   | Chapter names        | Outputs     | PDF layout                              |
//! |-----------|----------------------|-------------|-----------------------------------------|
//! | `Book`    | must be `<n>.md`     | EPUB + PDF  | pandoc default class, one-sided, plain  |
//! | `PdfOnly` | numeric prefix first | PDF         | `report` class, 11pt, blue links        |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod build;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use build::build;
pub use config::{BuildConfig, BuildConfigBuilder, BuildProfile, OrderingRule, OutputTarget, PdfStyle};
pub use error::{BookError, DiagramError};
pub use output::{ArtifactReport, ArtifactStatus, BuildReport, BuildStats, DocumentReport};
pub use pipeline::assemble::{InvocationOutcome, Pandoc, Typesetter};
pub use pipeline::render::{DiagramRenderer, MermaidCli};
pub use progress::{BuildProgressCallback, NoopProgressCallback, ProgressCallback};
