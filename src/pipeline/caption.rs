//! Caption derivation for rendered diagrams.
//!
//! Sources are tried in priority order, first match wins:
//!
//! 1. a `%% Title: …` comment directive
//! 2. a native Mermaid `title …` statement
//! 3. the diagram type, inferred from its declaration keyword
//! 4. a fingerprint of the block text, so no diagram is ever captionless

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

static RE_TITLE_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%%[ \t]*Title:(.*)").unwrap());

static RE_NATIVE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\btitle[ \t]+(.+)").unwrap());

/// Declaration keywords (lower-cased) and their captions, in priority order.
const TYPE_LABELS: &[(&str, &str)] = &[
    ("flowchart", "Flowchart Diagram"),
    ("sequencediagram", "Sequence Diagram"),
    ("classdiagram", "Class Diagram"),
    ("statediagram", "State Diagram"),
    ("gantt", "Gantt Chart"),
    ("pie", "Pie Chart"),
];

/// Number of hex digits of the fingerprint used in fallback captions.
const FINGERPRINT_LEN: usize = 6;

/// Derive the caption for a diagram from its raw source.
pub fn derive_caption(source: &str) -> String {
    title_directive(source)
        .or_else(|| native_title(source))
        .or_else(|| type_label(source).map(str::to_string))
        .unwrap_or_else(|| format!("Diagram {}", fingerprint(source)))
}

fn title_directive(source: &str) -> Option<String> {
    RE_TITLE_DIRECTIVE
        .captures(source)
        .map(|c| c[1].trim().to_string())
        .filter(|t| !t.is_empty())
}

fn native_title(source: &str) -> Option<String> {
    RE_NATIVE_TITLE
        .captures(source)
        .map(|c| c[1].trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Caption for the diagram type, by case-insensitive keyword search.
pub fn type_label(source: &str) -> Option<&'static str> {
    let lower = source.to_lowercase();
    TYPE_LABELS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, label)| *label)
}

/// Short, stable hex fingerprint of the exact block text.
pub fn fingerprint(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}
