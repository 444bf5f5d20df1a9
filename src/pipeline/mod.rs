//! Pipeline stages for Markdown-to-book conversion.
//!
//! Each submodule implements exactly one step. External tools sit behind
//! the [`render::DiagramRenderer`] and [`assemble::Typesetter`] traits so
//! every stage can be tested without mmdc or pandoc installed.
//!
//! ## Data Flow
//!
//! ```text
//! collect ──▶ extract ──▶ caption ──▶ render ──▶ preprocess ──▶ assemble ──▶ cleanup
//! (*.md)      (fences)    (alt text)  (mmdc)     (working copy)  (pandoc)     (scratch)
//! ```
//!
//! 1. [`collect`]    — list and order the chapter files
//! 2. [`extract`]    — find diagram fences in a chapter
//! 3. [`caption`]    — pick the alt text for each rendered diagram
//! 4. [`render`]     — run the diagram renderer on one block
//! 5. [`preprocess`] — swap rendered fences for image embeds
//! 6. [`assemble`]   — invoke the typesetter per artifact, with engine fallback
//! 7. [`cleanup`]    — remove working copies and images

pub mod assemble;
pub mod caption;
pub mod cleanup;
pub mod collect;
pub mod extract;
pub mod preprocess;
pub mod render;
