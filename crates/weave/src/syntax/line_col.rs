//! Line and column position utilities
//!
//! Spans produced by the tokenizer phase count chars, so the index here is
//! built over char offsets rather than bytes. It is built once per source
//! text and answers lookups with a binary search.

use crate::syntax::Span;

/// A line and column position in source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct LineCol {
    /// Zero-based line number
    pub line: u32,
    /// Zero-based column number (in chars)
    pub column: u32,
}

impl LineCol {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Line-start index over the chars of a source text.
///
/// # Example
///
/// ```rust
/// use weave::syntax::LineIndex;
///
/// let index = LineIndex::new("rule = 'a';\nnext = 'b';");
/// let pos = index.line_col(14);
/// assert_eq!((pos.line, pos.column), (1, 2));
/// ```
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Char offsets of line starts, beginning with 0
    line_starts: Vec<usize>,
    /// Length of the text in chars
    text_len: usize,
}

impl LineIndex {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let mut chars = text.chars().peekable();
        let mut offset = 0;

        while let Some(c) = chars.next() {
            offset += 1;
            match c {
                '\n' => line_starts.push(offset),
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                        offset += 1;
                    }
                    line_starts.push(offset);
                }
                _ => {}
            }
        }

        Self {
            line_starts,
            text_len: offset,
        }
    }

    /// Convert a char offset to a line/column position.
    ///
    /// Offsets past the end of the text are clamped to the end.
    #[must_use]
    pub fn line_col(&self, offset: usize) -> LineCol {
        let offset = offset.min(self.text_len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let column = offset - self.line_starts[line];

        LineCol {
            line: u32::try_from(line).unwrap_or(u32::MAX),
            column: u32::try_from(column).unwrap_or(u32::MAX),
        }
    }

    /// Position of the first char of `span`.
    #[must_use]
    pub fn span_start(&self, span: Span) -> LineCol {
        self.line_col(span.start())
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Char offset of the start of `line`, if it exists.
    #[must_use]
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    #[must_use]
    pub const fn text_len(&self) -> usize {
        self.text_len
    }
}
