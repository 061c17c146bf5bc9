#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open span `[start, start + len)` over an input sequence.
///
/// Offsets count elements of the matched sequence: chars for the tokenizer
/// phase, tokens for the grammar phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Span {
    start: usize,
    len: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// Build a span from inclusive start and exclusive end offsets.
    #[must_use]
    pub const fn from_bounds(start: usize, end: usize) -> Self {
        Self {
            start,
            len: end.saturating_sub(start),
        }
    }

    #[must_use]
    pub const fn empty(at: usize) -> Self {
        Self { start: at, len: 0 }
    }

    #[must_use]
    pub const fn start(self) -> usize {
        self.start
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn end(self) -> usize {
        self.start + self.len
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub const fn contains(self, offset: usize) -> bool {
        offset >= self.start && offset < self.end()
    }

    #[must_use]
    pub const fn contains_span(self, other: Self) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub fn cover(self, other: Self) -> Self {
        Self::from_bounds(self.start.min(other.start), self.end().max(other.end()))
    }

    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());

        if start < end {
            Some(Self::from_bounds(start, end))
        } else {
            None
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end())
    }
}

#[cfg(feature = "diagnostics")]
impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        Self::new(miette::SourceOffset::from(span.start()), span.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_bounds() {
        let span = Span::new(3, 4);
        assert_eq!(span.start(), 3);
        assert_eq!(span.len(), 4);
        assert_eq!(span.end(), 7);
        assert!(!span.is_empty());
        assert_eq!(Span::from_bounds(3, 7), span);
    }

    #[test]
    fn test_span_from_inverted_bounds_is_empty() {
        let span = Span::from_bounds(5, 2);
        assert!(span.is_empty());
        assert_eq!(span.start(), 5);
    }

    #[test]
    fn test_span_contains() {
        let span = Span::new(2, 3);
        assert!(!span.contains(1));
        assert!(span.contains(2));
        assert!(span.contains(4));
        assert!(!span.contains(5));
        assert!(span.contains_span(Span::new(3, 2)));
        assert!(!span.contains_span(Span::new(3, 3)));
    }

    #[test]
    fn test_span_cover_and_intersect() {
        let a = Span::new(0, 4);
        let b = Span::new(2, 6);
        assert_eq!(a.cover(b), Span::from_bounds(0, 8));
        assert_eq!(a.intersect(b), Some(Span::from_bounds(2, 4)));
        assert_eq!(a.intersect(Span::new(4, 1)), None);
    }

    #[test]
    fn test_span_display() {
        assert_eq!(Span::new(1, 2).to_string(), "1..3");
    }
}
