//! Diagram block extraction.
//!
//! A diagram block is a fence opened by three backticks immediately followed
//! by the diagram language (` ```mermaid `) and closed by the next three
//! backticks. Matching is non-greedy and spans lines, so a document with
//! several diagrams yields one block per fence pair.

use regex::Regex;
use std::ops::Range;

/// A fenced diagram found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramBlock {
    /// 0-based ordinal within the document.
    pub index: usize,
    /// Byte range of the whole fence in the document.
    pub span: Range<usize>,
    /// The whole fence, backticks included.
    pub fenced: String,
    /// Text between the opening tag and the closing fence.
    pub source: String,
}

/// Compile the block pattern for `language`.
pub fn block_pattern(language: &str) -> Regex {
    let pattern = format!(r"(?s)```{}(.*?)```", regex::escape(language));
    // The language is escaped, so the pattern is always valid.
    Regex::new(&pattern).expect("escaped diagram pattern compiles")
}

/// Find every non-overlapping diagram block in `text`.
pub fn extract_blocks(text: &str, language: &str) -> Vec<DiagramBlock> {
    block_pattern(language)
        .captures_iter(text)
        .enumerate()
        .filter_map(|(index, caps)| {
            let whole = caps.get(0)?;
            let inner = caps.get(1)?;
            Some(DiagramBlock {
                index,
                span: whole.range(),
                fenced: whole.as_str().to_string(),
                source: inner.as_str().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "# Boot\n\nText.\n\n```mermaid\nflowchart LR\n    A --> B\n```\n\nMore.\n\n```rust\nfn main() {}\n```\n\n```mermaid\npie title Flash\n    \"code\" : 70\n```\n";

    #[test]
    fn finds_only_diagram_fences() {
        let blocks = extract_blocks(DOC, "mermaid");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].index, 0);
        assert_eq!(blocks[0].source, "\nflowchart LR\n    A --> B\n");
        assert!(blocks[1].source.contains("pie title Flash"));
    }

    #[test]
    fn span_covers_the_whole_fence() {
        let blocks = extract_blocks(DOC, "mermaid");
        for b in &blocks {
            assert_eq!(&DOC[b.span.clone()], b.fenced);
            assert!(b.fenced.starts_with("```mermaid"));
            assert!(b.fenced.ends_with("```"));
        }
    }

    #[test]
    fn no_blocks_in_plain_text() {
        assert!(extract_blocks("# Title\n\nNothing here.\n", "mermaid").is_empty());
    }

    #[test]
    fn unterminated_fence_is_ignored() {
        assert!(extract_blocks("```mermaid\ngraph TD\n A-->B\n", "mermaid").is_empty());
    }

    #[test]
    fn language_is_matched_literally() {
        let text = "```c++\nint x;\n```\n```cxx\nint y;\n```";
        let blocks = extract_blocks(text, "c++");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].source, "\nint x;\n");
    }
}
