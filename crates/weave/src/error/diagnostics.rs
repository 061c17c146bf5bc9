//! # Diagnostic Utilities
//!
//! Structured diagnostics reported by log rules, plus "did you mean"
//! suggestions for misspelled rule names.

use crate::syntax::{LineIndex, Span};
use std::fmt;

/// Diagnostic level. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    /// Aborts the parse that produced it
    Fatal,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }

    /// Parse a script log keyword.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "fatal" => Some(Self::Fatal),
            _ => None,
        }
    }

    /// Matching `log` crate level.
    #[must_use]
    pub const fn log_level(self) -> log::Level {
        match self {
            Self::Debug => log::Level::Debug,
            Self::Info => log::Level::Info,
            Self::Warning => log::Level::Warn,
            Self::Error | Self::Fatal => log::Level::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a diagnostic points: a span plus its 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    pub span: Span,
    pub line: u32,
    pub column: u32,
}

impl Location {
    /// Locate `span` in the text indexed by `index`.
    #[must_use]
    pub fn new(span: Span, index: &LineIndex) -> Self {
        let lc = index.span_start(span);
        Self {
            span,
            line: lc.line.saturating_add(1),
            column: lc.column.saturating_add(1),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Location,
}

impl Diagnostic {
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>, location: Location) -> Self {
        Self {
            severity,
            message: message.into(),
            location,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity >= Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.severity, self.message)
    }
}

/// Queries over a collected diagnostic list.
pub trait DiagnosticList {
    /// Most severe level present.
    fn max_severity(&self) -> Option<Severity>;

    /// Whether any entry is at least `level`.
    fn any_at_least(&self, level: Severity) -> bool {
        self.max_severity().is_some_and(|max| max >= level)
    }
}

impl DiagnosticList for [Diagnostic] {
    fn max_severity(&self) -> Option<Severity> {
        self.iter().map(|d| d.severity).max()
    }
}

impl DiagnosticList for Vec<Diagnostic> {
    fn max_severity(&self) -> Option<Severity> {
        self.as_slice().max_severity()
    }
}

/// Most similar candidate to `actual`, if any is close enough.
///
/// ```rust
/// use weave::error::diagnostics::did_you_mean;
///
/// let names = ["expression", "number", "string"];
/// assert_eq!(did_you_mean("expresion", names), Some("expression".to_string()));
/// assert_eq!(did_you_mean("zzz", names), None);
/// ```
pub fn did_you_mean<'a>(actual: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let actual_lower = actual.to_lowercase();
    let mut best_match: Option<(&str, f64)> = None;
    let threshold = 0.6;

    for candidate in candidates {
        let similarity = string_similarity(&actual_lower, &candidate.to_lowercase());
        if similarity >= threshold {
            match best_match {
                None => best_match = Some((candidate, similarity)),
                Some((_, best_sim)) if similarity > best_sim => {
                    best_match = Some((candidate, similarity));
                }
                _ => {}
            }
        }
    }

    best_match.map(|(suggestion, _)| suggestion.to_string())
}

/// Levenshtein similarity between 0.0 (disjoint) and 1.0 (identical).
fn string_similarity(s1: &str, s2: &str) -> f64 {
    if s1 == s2 {
        return 1.0;
    }
    if s1.is_empty() || s2.is_empty() {
        return 0.0;
    }

    let distance = levenshtein_distance(s1, s2);
    let max_len = s1.chars().count().max(s2.chars().count());
    1.0 - (distance as f64 / max_len as f64)
}

fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
        assert_eq!(Severity::from_keyword("warning"), Some(Severity::Warning));
        assert_eq!(Severity::from_keyword("loud"), None);
    }

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("same", "same"), 0);
    }

    #[test]
    fn test_did_you_mean() {
        let names = ["term", "factor", "expr"];
        assert_eq!(did_you_mean("exprr", names), Some("expr".to_string()));
        assert_eq!(did_you_mean("factr", names), Some("factor".to_string()));
        assert_eq!(did_you_mean("whitespace", names), None);
        assert_eq!(did_you_mean("x", std::iter::empty()), None);
    }

    #[test]
    fn test_diagnostic_display_and_list() {
        let index = LineIndex::new("ab\ncd");
        let location = Location::new(Span::new(4, 1), &index);
        assert_eq!((location.line, location.column), (2, 2));

        let diagnostics = vec![
            Diagnostic::new(Severity::Info, "note", location),
            Diagnostic::new(Severity::Warning, "careful", location),
        ];
        assert_eq!(diagnostics.max_severity(), Some(Severity::Warning));
        assert!(diagnostics.any_at_least(Severity::Warning));
        assert!(!diagnostics.any_at_least(Severity::Error));
        assert_eq!(diagnostics[1].to_string(), "2:2: warning: careful");
    }
}
