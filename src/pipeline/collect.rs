//! Chapter discovery: list the Markdown files of a book in reading order.
//!
//! The directory listing is sorted by name before the ordering rule is
//! applied, so files that tie under the rule (unnumbered files in lenient
//! mode) always come out in the same order on every platform.

use crate::config::{OrderingRule, WORKING_COPY_PREFIX};
use crate::error::BookError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A chapter file as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// File name, e.g. `3.md`.
    pub name: String,
    /// Full path to the file.
    pub path: PathBuf,
    /// Integer before the first `.`, when there is one.
    pub order: Option<u64>,
}

/// List the chapter files in `dir`, ordered by `rule`.
///
/// # Errors
/// - [`BookError::WorkingDirNotFound`] if `dir` is not a directory
/// - [`BookError::InvalidChapterName`] under [`OrderingRule::Strict`] when a
///   file name does not start with an integer
/// - [`BookError::NoSourceDocuments`] if no chapter file is present
pub fn collect_sources(dir: &Path, rule: &OrderingRule) -> Result<Vec<SourceDocument>, BookError> {
    if !dir.is_dir() {
        return Err(BookError::WorkingDirNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| BookError::ReadDirFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut names: Vec<String> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BookError::ReadDirFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_file || !name.ends_with(".md") {
            continue;
        }
        if name.starts_with(WORKING_COPY_PREFIX) {
            debug!("Ignoring leftover working copy {}", name);
            continue;
        }
        names.push(name);
    }
    names.sort();

    if names.is_empty() {
        return Err(BookError::NoSourceDocuments {
            path: dir.to_path_buf(),
        });
    }

    let mut docs: Vec<SourceDocument> = match rule {
        OrderingRule::Strict => names
            .into_iter()
            .map(|name| {
                let order = strict_key(&name)?;
                Ok(SourceDocument {
                    path: dir.join(&name),
                    order: Some(order),
                    name,
                })
            })
            .collect::<Result<_, BookError>>()?,
        OrderingRule::Lenient { .. } => names
            .into_iter()
            .map(|name| SourceDocument {
                path: dir.join(&name),
                order: ordering_key(&name),
                name,
            })
            .collect(),
    };

    // `None` sorts after every number; the sort is stable.
    docs.sort_by_key(|d| (d.order.is_none(), d.order));

    if let OrderingRule::Lenient {
        appendix: Some(appendix),
    } = rule
    {
        if let Some(pos) = docs.iter().position(|d| &d.name == appendix) {
            let doc = docs.remove(pos);
            docs.push(doc);
        }
    }

    info!(
        "Found {} chapters: {}",
        docs.len(),
        docs.iter()
            .map(|d| d.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(docs)
}

/// Integer before the first `.` of `name`, if that prefix is all digits.
pub fn ordering_key(name: &str) -> Option<u64> {
    let prefix = name.split('.').next().unwrap_or("");
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok()
}

fn strict_key(name: &str) -> Result<u64, BookError> {
    let prefix = name.split('.').next().unwrap_or("");
    prefix
        .parse::<u64>()
        .map_err(|e| BookError::InvalidChapterName {
            name: name.to_string(),
            reason: format!("prefix '{}': {}", prefix, e),
        })
}

// ── Chapter headings ─────────────────────────────────────────────────────

static RE_H1: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#\s+(.+)$").unwrap());
static RE_H2: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^##\s+(.+)$").unwrap());

/// Chapter title shown when a file has no level-1 heading.
pub const UNTITLED_CHAPTER: &str = "Untitled Chapter";

/// First level-1 heading of a chapter and all of its level-2 headings.
pub fn chapter_info(text: &str) -> (String, Vec<String>) {
    let title = RE_H1
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| UNTITLED_CHAPTER.to_string());
    let sections = RE_H2
        .captures_iter(text)
        .map(|c| c[1].trim().to_string())
        .collect();
    (title, sections)
}
