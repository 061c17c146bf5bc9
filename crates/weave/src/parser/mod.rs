//! # Parser Module
//!
//! The matching engine that runs a [`RuleGraph`](crate::grammar::RuleGraph)
//! over an input sequence.
//!
//! Matching is PEG-style: ordered choice, greedy repetition, no ambiguity
//! resolution. Every rule returns a [`ParseResult`]; failures are ordinary
//! values and the only `Err` path is [`ParseAbort`] (a fatal log rule or the
//! nesting limit).
//!
//! - [`engine`]: the recursive matcher and pruning
//! - [`evaluation`]: precedence climbing for binary-operator chains
//! - [`recovery`]: skip-until and log primitives
//! - [`tokens`]: splitting a tokenizer match into tokens

pub mod engine;
pub mod evaluation;
pub mod recovery;
pub mod tokens;

pub use engine::{Matcher, prune};
pub use recovery::{LogEntry, collect_logs};
pub use tokens::{Token, Tokenized, tokenize};

use crate::error::ParseAbort;
use crate::syntax::{Annotation, Span};

/// Outcome of matching one rule at one position.
///
/// `len` is only meaningful when `success` is set. A successful result may
/// carry no annotations at all (pruned or zero-width rules).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseResult {
    pub success: bool,
    pub len: usize,
    pub annotations: Vec<Annotation>,
}

impl ParseResult {
    #[must_use]
    pub const fn success(len: usize, annotations: Vec<Annotation>) -> Self {
        Self {
            success: true,
            len,
            annotations,
        }
    }

    #[must_use]
    pub const fn failure() -> Self {
        Self {
            success: false,
            len: 0,
            annotations: Vec::new(),
        }
    }

    /// Span consumed when the match started at `start`.
    #[must_use]
    pub const fn span(&self, start: usize) -> Span {
        Span::new(start, self.len)
    }
}

/// Result of running a graph over a whole input.
pub type MatchResult = Result<ParseResult, ParseAbort>;

/// Matcher settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseConfig {
    /// Maximum rule nesting depth before the match aborts
    pub max_depth: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self { max_depth: 512 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_constructors() {
        let ok = ParseResult::success(3, Vec::new());
        assert!(ok.success);
        assert_eq!(ok.span(2), Span::new(2, 3));

        let failed = ParseResult::failure();
        assert!(!failed.success);
        assert_eq!(failed, ParseResult::default());
    }
}
