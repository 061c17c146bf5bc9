//! Turning a character-level match into a token stream.
//!
//! A tokenizer graph is an ordinary `RuleGraph<char>` whose root repeats a
//! choice of token rules. Each top-level annotation under the root becomes
//! one [`Token`]; rules pruned with `All` (whitespace, comments) leave no
//! token behind.

use crate::error::ParseAbort;
use crate::grammar::{RuleGraph, RuleId};
use crate::parser::recovery::{LogEntry, collect_logs};
use crate::parser::{Matcher, ParseConfig};
use crate::syntax::{Annotation, Span};

/// One token: the tokenizer rule that produced it and the chars it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    pub kind: RuleId,
    pub span: Span,
    pub annotation: Annotation,
}

impl Token {
    /// Source text of the token.
    #[must_use]
    pub fn text(&self, chars: &[char]) -> String {
        chars
            .get(self.span.start()..self.span.end())
            .map(|slice| slice.iter().collect())
            .unwrap_or_default()
    }
}

/// Output of [`tokenize`].
#[derive(Debug, Clone, Default)]
pub struct Tokenized {
    pub tokens: Vec<Token>,
    /// Log annotations found while tokenizing, spans in chars
    pub logs: Vec<LogEntry>,
    /// Chars consumed by the tokenizer root
    pub len: usize,
    /// Furthest char position where a match failed
    pub farthest: usize,
}

impl Tokenized {
    /// Token kinds, the element sequence of the grammar phase.
    #[must_use]
    pub fn kinds(&self) -> Vec<RuleId> {
        self.tokens.iter().map(|token| token.kind).collect()
    }

    /// Convert a span over tokens into a span over chars.
    ///
    /// Empty spans map to the start of the token they sit before, or to
    /// `text_len` past the last token.
    #[must_use]
    pub fn char_span(&self, span: Span, text_len: usize) -> Span {
        let start_of = |index: usize| {
            self.tokens
                .get(index)
                .map_or(text_len, |token| token.span.start())
        };
        if span.is_empty() {
            return Span::empty(start_of(span.start()));
        }
        let start = start_of(span.start());
        let end = self
            .tokens
            .get(span.end() - 1)
            .map_or(text_len, |token| token.span.end());
        Span::from_bounds(start, end)
    }
}

/// Run `graph` from its root over `chars` and split the result into tokens.
///
/// # Errors
///
/// Propagates [`ParseAbort`] from the match, including a missing root.
pub fn tokenize(graph: &RuleGraph<char>, chars: &[char], config: ParseConfig) -> Result<Tokenized, ParseAbort> {
    let root = graph.root().ok_or(ParseAbort::MissingRoot)?;
    let mut matcher = Matcher::new(graph, chars, config);
    let result = matcher.parse(root, 0)?;
    let farthest = matcher.farthest();

    if !result.success {
        return Ok(Tokenized {
            farthest,
            ..Tokenized::default()
        });
    }

    let logs = collect_logs(graph, &result.annotations);
    let mut annotations = result.annotations;
    if annotations.len() == 1 && annotations[0].rule() == root {
        annotations = annotations.remove(0).into_children();
    }

    let tokens = annotations
        .into_iter()
        .filter(|annotation| !graph.is_log(annotation.rule()))
        .map(|annotation| Token {
            kind: annotation.rule(),
            span: annotation.span(),
            annotation,
        })
        .collect();

    Ok(Tokenized {
        tokens,
        logs,
        len: result.len,
        farthest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GraphBuilder, Pruning, RuleDef};

    fn word_tokenizer() -> (RuleGraph<char>, RuleId, RuleId) {
        let mut b = GraphBuilder::new();
        let letter = b.add(RuleDef::range('a', 'z'));
        let word = b.define("word", RuleDef::count(letter, 1, 0).pruning(Pruning::Children));
        let space = b.add(RuleDef::single(' '));
        let ws = b.define("ws", RuleDef::count(space, 1, 0).pruning(Pruning::All));
        let comma = b.define("comma", RuleDef::single(','));
        let token = b.add(RuleDef::one_of([word, ws, comma]).pruning(Pruning::Root));
        let tokens = b.define("tokens", RuleDef::count(token, 0, 0));
        b.set_root(tokens);
        (b.finish().unwrap(), word, comma)
    }

    #[test]
    fn test_tokenize_drops_pruned_tokens() {
        let (graph, word, comma) = word_tokenizer();
        let chars: Vec<char> = "ab, cd".chars().collect();
        let out = tokenize(&graph, &chars, ParseConfig::default()).unwrap();

        assert_eq!(out.len, 6);
        assert_eq!(out.kinds(), vec![word, comma, word]);
        assert_eq!(out.tokens[2].span, Span::new(4, 2));
        assert_eq!(out.tokens[2].text(&chars), "cd");
        assert!(out.tokens[0].annotation.is_leaf());
    }

    #[test]
    fn test_tokenize_stops_at_unknown_char() {
        let (graph, _, _) = word_tokenizer();
        let chars: Vec<char> = "ab?cd".chars().collect();
        let out = tokenize(&graph, &chars, ParseConfig::default()).unwrap();
        assert_eq!(out.len, 2);
        assert_eq!(out.tokens.len(), 1);
    }

    #[test]
    fn test_char_span() {
        let (graph, _, _) = word_tokenizer();
        let chars: Vec<char> = "ab, cd".chars().collect();
        let out = tokenize(&graph, &chars, ParseConfig::default()).unwrap();

        assert_eq!(out.char_span(Span::new(1, 2), 6), Span::new(2, 4));
        assert_eq!(out.char_span(Span::empty(1), 6), Span::empty(2));
        assert_eq!(out.char_span(Span::empty(3), 6), Span::empty(6));
    }
}
