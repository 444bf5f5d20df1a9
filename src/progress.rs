//! Progress-callback trait for build events.
//!
//! Inject an [`Arc<dyn BuildProgressCallback>`] via
//! [`crate::config::BuildConfigBuilder::progress_callback`] to receive events
//! as the pipeline walks chapters, renders diagrams and runs the typesetter.
//!
//! # Example
//!
//! ```rust
//! use md2book::{BuildConfig, BuildProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rendered: AtomicUsize,
//! }
//!
//! impl BuildProgressCallback for CountingCallback {
//!     fn on_diagram_rendered(&self, document: &str, index: usize) {
//!         self.rendered.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{document}: diagram {index} rendered");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { rendered: AtomicUsize::new(0) });
//!
//! let config = BuildConfig::builder()
//!     .progress_callback(counter as Arc<dyn BuildProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::config::OutputTarget;
use std::sync::Arc;

/// Called by the build pipeline as it progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The pipeline is sequential, but the trait is
/// `Send + Sync` so implementations can be shared with other threads.
pub trait BuildProgressCallback: Send + Sync {
    /// Called once the chapter list is known.
    fn on_build_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called before a chapter is preprocessed.
    ///
    /// # Arguments
    /// * `position` — 1-indexed position in the book
    /// * `total`    — number of chapters
    fn on_document_start(&self, name: &str, position: usize, total: usize) {
        let _ = (name, position, total);
    }

    /// Called after a diagram image has been written.
    fn on_diagram_rendered(&self, document: &str, index: usize) {
        let _ = (document, index);
    }

    /// Called when a diagram is left as source text.
    fn on_diagram_failed(&self, document: &str, index: usize, error: &str) {
        let _ = (document, index, error);
    }

    /// Called after a chapter's working copy has been written.
    fn on_document_complete(&self, name: &str, diagrams_rendered: usize) {
        let _ = (name, diagrams_rendered);
    }

    /// Called before the typesetter runs for an artifact.
    fn on_artifact_start(&self, target: OutputTarget) {
        let _ = target;
    }

    /// Called once per artifact with the final outcome.
    fn on_artifact_complete(&self, target: OutputTarget, success: bool) {
        let _ = (target, success);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BuildProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BuildConfig`].
pub type ProgressCallback = Arc<dyn BuildProgressCallback>;
