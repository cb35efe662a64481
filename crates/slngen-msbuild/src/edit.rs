//! Span-based text editing
//!
//! Project files are edited by splicing new text into the original source at
//! element spans, so formatting, comments and line endings elsewhere in the
//! file stay byte-for-byte identical.

use crate::xml::Span;
use tracing::warn;

#[derive(Debug, Clone)]
struct TextEdit {
    start: usize,
    end: usize,
    replacement: String,
    seq: usize,
}

/// A batch of non-overlapping edits against one source text
#[derive(Debug, Clone, Default)]
pub struct TextEdits {
    edits: Vec<TextEdit>,
}

impl TextEdits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `text` at byte offset `at`
    pub fn insert(&mut self, at: usize, text: impl Into<String>) {
        self.push(at, at, text.into());
    }

    /// Replace the bytes covered by `span`
    pub fn replace(&mut self, span: Span, text: impl Into<String>) {
        self.push(span.start, span.end, text.into());
    }

    fn push(&mut self, start: usize, end: usize, replacement: String) {
        let seq = self.edits.len();
        self.edits.push(TextEdit {
            start,
            end,
            replacement,
            seq,
        });
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Apply all edits in offset order.
    ///
    /// Inserts at the same offset keep the order they were added in; an
    /// edit overlapping an earlier one is dropped.
    pub fn apply(mut self, source: &str) -> String {
        self.edits.sort_by_key(|e| (e.start, e.seq));

        let added: usize = self.edits.iter().map(|e| e.replacement.len()).sum();
        let mut output = String::with_capacity(source.len() + added);
        let mut cursor = 0;

        for edit in self.edits {
            if edit.start < cursor || edit.end > source.len() {
                warn!("Dropping overlapping edit at byte {}", edit.start);
                continue;
            }
            output.push_str(&source[cursor..edit.start]);
            output.push_str(&edit.replacement);
            cursor = edit.end;
        }

        output.push_str(&source[cursor..]);
        output
    }
}

/// Line terminator used by the file, CRLF when any line ends with it
pub fn line_ending(source: &str) -> &'static str {
    if source.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// Whitespace between the start of the line and `offset`.
///
/// Empty when non-whitespace precedes `offset` on its line.
pub fn indentation_at(source: &str, offset: usize) -> &str {
    let line_start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let prefix = &source[line_start..offset];
    if prefix.chars().all(|c| c == ' ' || c == '\t') {
        prefix
    } else {
        ""
    }
}

/// One level of indentation as used by the file: a tab, or the smallest
/// non-zero run of leading spaces (two when nothing is indented)
pub fn indent_unit(source: &str) -> String {
    let mut smallest: Option<usize> = None;
    for line in source.lines() {
        if line.starts_with('\t') {
            return "\t".to_string();
        }
        let spaces = line.len() - line.trim_start_matches(' ').len();
        if spaces > 0 && line.len() > spaces {
            smallest = Some(smallest.map_or(spaces, |s| s.min(spaces)));
        }
    }
    " ".repeat(smallest.unwrap_or(2))
}

/// Check if `offset` is at the beginning of a line
pub fn at_line_start(source: &str, offset: usize) -> bool {
    offset == 0 || source[..offset].ends_with('\n')
}
