//! Byte ranges over source text and the line/column mapping built on them.
//!
//! Every symbol, reference and queued edit is addressed by a [`Span`] into the
//! committed text of its file. Spans never outlive a commit: the file's
//! generation counter changes and old spans are rejected.

use std::fmt;

use serde::Serialize;

/// A half-open byte range `[start, end)` into a file's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {start} > end {end}");
        Self { start, end }
    }

    /// Zero-width span at `offset`.
    pub fn point(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when `other` lies entirely within `self` (boundaries included).
    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// True when the two spans share at least one byte.
    pub fn overlaps(&self, other: Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Text covered by this span, or `None` if it is out of bounds or splits a
    /// UTF-8 character.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.start..self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// 1-based line, 0-based byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineCol {
    pub line: usize,
    pub col: usize,
}

/// Offsets of every line start, for O(log n) offset → line/column lookups.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { line_starts }
    }

    pub fn line_col(&self, offset: usize) -> LineCol {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert - 1,
        };
        LineCol {
            line: line + 1,
            col: offset - self.line_starts[line],
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

// ---------------------------------------------------------------------------
// Removal widening
// ---------------------------------------------------------------------------

/// Widen a statement-level span so that removing it leaves well-formed text:
/// whole lines are taken when the span is alone on them, a trailing `;` is
/// swallowed, and one adjacent blank line goes too when the removal would
/// otherwise leave two blank lines in a row.
pub fn widen_statement(text: &str, span: Span) -> Span {
    let bytes = text.as_bytes();
    let mut start = span.start;
    let mut end = span.end;

    // Trailing semicolon directly after the statement.
    let mut probe = end;
    while probe < bytes.len() && (bytes[probe] == b' ' || bytes[probe] == b'\t') {
        probe += 1;
    }
    if probe < bytes.len() && bytes[probe] == b';' {
        end = probe + 1;
    }

    let line_start = text[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = text[end..].find('\n').map(|i| end + i).unwrap_or(text.len());
    let alone_before = text[line_start..start].trim().is_empty();
    let alone_after = text[end..line_end].trim().is_empty();

    if !(alone_before && alone_after) {
        // Shares its line with other code; take trailing horizontal whitespace only.
        while end < bytes.len() && (bytes[end] == b' ' || bytes[end] == b'\t') {
            end += 1;
        }
        return Span::new(start, end);
    }

    start = line_start;
    end = if line_end < text.len() { line_end + 1 } else { line_end };

    let blank_before = start >= 1 && is_blank_line_ending_at(text, start - 1);
    let next_is_blank = next_line_is_blank(text, end);
    let at_file_start = start == 0;
    if next_is_blank && (blank_before || at_file_start) {
        end = skip_line(text, end);
    } else if next_is_blank && end >= text.len() {
        // nothing follows
    } else if blank_before && end >= text.len() {
        // Removing the last statement: drop the blank separator above it.
        start = previous_line_start(text, start - 1);
    }

    Span::new(start, end)
}

/// Widen a list-element span (import specifier, parameter, argument...) to
/// take one adjacent comma with it, preferring the following one.
pub fn widen_list_item(text: &str, span: Span) -> Span {
    let bytes = text.as_bytes();

    let mut after = span.end;
    while after < bytes.len() && bytes[after].is_ascii_whitespace() {
        after += 1;
    }
    if after < bytes.len() && bytes[after] == b',' {
        let mut end = after + 1;
        while end < bytes.len() && (bytes[end] == b' ' || bytes[end] == b'\t') {
            end += 1;
        }
        return Span::new(span.start, end);
    }

    let mut before = span.start;
    while before > 0 && bytes[before - 1].is_ascii_whitespace() {
        before -= 1;
    }
    if before > 0 && bytes[before - 1] == b',' {
        return Span::new(before - 1, span.end);
    }

    span
}

/// Offset of the first byte of the line containing `offset`.
pub fn line_start_of(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// Leading whitespace of the line containing `offset`.
pub fn indentation_at(text: &str, offset: usize) -> &str {
    let start = line_start_of(text, offset);
    let rest = &text[start..];
    let width = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    &rest[..width]
}

fn is_blank_line_ending_at(text: &str, newline_at: usize) -> bool {
    // `newline_at` is the '\n' that terminates the line we are asking about.
    let start = text[..newline_at].rfind('\n').map(|i| i + 1).unwrap_or(0);
    newline_at > 0 && text[start..newline_at].trim().is_empty()
}

fn next_line_is_blank(text: &str, from: usize) -> bool {
    if from >= text.len() {
        return false;
    }
    let end = text[from..].find('\n').map(|i| from + i).unwrap_or(text.len());
    text[from..end].trim().is_empty()
}

fn skip_line(text: &str, from: usize) -> usize {
    text[from..]
        .find('\n')
        .map(|i| from + i + 1)
        .unwrap_or(text.len())
}

fn previous_line_start(text: &str, newline_at: usize) -> usize {
    text[..newline_at].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply_removal(text: &str, span: Span) -> String {
        format!("{}{}", &text[..span.start], &text[span.end..])
    }

    #[test]
    fn test_line_col_lookup() {
        let idx = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(idx.line_col(0), LineCol { line: 1, col: 0 });
        assert_eq!(idx.line_col(4), LineCol { line: 2, col: 1 });
        assert_eq!(idx.line_col(6), LineCol { line: 3, col: 0 });
        assert_eq!(idx.line_col(8), LineCol { line: 4, col: 1 });
        assert_eq!(idx.line_count(), 4);
    }

    #[test]
    fn test_overlap_and_containment() {
        let a = Span::new(2, 6);
        assert!(a.overlaps(Span::new(5, 9)));
        assert!(!a.overlaps(Span::new(6, 9)), "adjacent spans do not overlap");
        assert!(!a.overlaps(Span::point(4)), "zero-width spans never share a byte");
        assert!(a.contains(Span::new(2, 6)));
        assert!(a.contains(Span::point(6)));
        assert!(!a.contains(Span::new(1, 3)));
    }

    #[test]
    fn test_slice_rejects_char_boundary() {
        let text = "é";
        assert_eq!(Span::new(0, 2).slice(text), Some("é"));
        assert_eq!(Span::new(0, 1).slice(text), None);
        assert_eq!(Span::new(0, 9).slice(text), None);
    }

    #[test]
    fn test_widen_statement_takes_whole_line() {
        let text = "const a = 1;\nfunction f() {}\nconst b = 2;\n";
        let start = text.find("function").unwrap();
        let span = Span::new(start, start + "function f() {}".len());
        let widened = widen_statement(text, span);
        assert_eq!(apply_removal(text, widened), "const a = 1;\nconst b = 2;\n");
    }

    #[test]
    fn test_widen_statement_collapses_double_blank() {
        let text = "const a = 1;\n\nfunction f() {}\n\nconst b = 2;\n";
        let start = text.find("function").unwrap();
        let span = Span::new(start, start + "function f() {}".len());
        let widened = widen_statement(text, span);
        assert_eq!(apply_removal(text, widened), "const a = 1;\n\nconst b = 2;\n");
    }

    #[test]
    fn test_widen_statement_last_in_file() {
        let text = "const a = 1;\n\nfunction f() {}\n";
        let start = text.find("function").unwrap();
        let span = Span::new(start, start + "function f() {}".len());
        let widened = widen_statement(text, span);
        assert_eq!(apply_removal(text, widened), "const a = 1;\n");
    }

    #[test]
    fn test_widen_statement_shared_line() {
        let text = "import { a } from './a'; foo();";
        let span = Span::new(0, "import { a } from './a'".len());
        let widened = widen_statement(text, span);
        assert_eq!(apply_removal(text, widened), "foo();");
    }

    #[test]
    fn test_widen_list_item_prefers_trailing_comma() {
        let text = "import { a, b, c } from './x';";
        let b = text.find('b').unwrap();
        let widened = widen_list_item(text, Span::new(b, b + 1));
        assert_eq!(apply_removal(text, widened), "import { a, c } from './x';");
    }

    #[test]
    fn test_widen_list_item_last_element() {
        let text = "import { a, b } from './x';";
        let b = text.find('b').unwrap();
        let widened = widen_list_item(text, Span::new(b, b + 1));
        assert_eq!(apply_removal(text, widened), "import { a } from './x';");
    }

    #[test]
    fn test_indentation_at() {
        let text = "class A {\n    run() {}\n}";
        let off = text.find("run").unwrap();
        assert_eq!(indentation_at(text, off), "    ");
    }
}
