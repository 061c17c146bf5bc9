//! # Error Recovery
//!
//! Primitives grammars use to keep going past malformed input.
//!
//! - **Skip** advances until a synchronization rule matches (panic mode)
//! - **Find** is Skip that stops before the match and fails at end of input
//! - **Log** records a diagnostic in the tree and succeeds; at fatal level it
//!   aborts the whole match instead
//!
//! A typical recovery branch is a sequence ending in a log and a skip:
//! `error 'missing ;', stop_after ';'`.

use crate::error::{ParseAbort, Severity};
use crate::grammar::{Element, RuleGraph, RuleId, RuleKind};
use crate::parser::{Matcher, MatchResult, ParseResult};
use crate::syntax::{Annotation, Span};
use compact_str::CompactString;

/// Advance one element at a time from `start` until `stop` matches.
///
/// `stop` is tried before each element is consumed, and once more at the end
/// of input. With `stop_before` the match of `stop` is left unconsumed;
/// otherwise it is consumed and its annotations become the node's children.
pub(crate) fn skip<T: Element>(
    matcher: &mut Matcher<'_, '_, T>,
    id: RuleId,
    stop: RuleId,
    stop_before: bool,
    fail_on_eof: bool,
    start: usize,
) -> MatchResult {
    let end_of_input = matcher.input().len();
    let mut pos = start;

    loop {
        let found = matcher.parse(stop, pos)?;
        if found.success {
            let (end, children) = if stop_before {
                (pos, Vec::new())
            } else {
                (pos + found.len, found.annotations)
            };
            return Ok(skipped(id, start, end, children));
        }

        if pos >= end_of_input {
            if fail_on_eof {
                return Ok(ParseResult::failure());
            }
            return Ok(skipped(id, start, pos, Vec::new()));
        }
        pos += 1;
    }
}

fn skipped(id: RuleId, start: usize, end: usize, children: Vec<Annotation>) -> ParseResult {
    let span = Span::from_bounds(start, end);
    ParseResult::success(span.len(), vec![Annotation::new(id, span, children)])
}

/// Record a diagnostic at `start` if `condition` is absent or matches.
///
/// The log node spans the condition's match but the rule itself consumes
/// nothing. A failing condition makes the log succeed silently.
pub(crate) fn log<T: Element>(
    matcher: &mut Matcher<'_, '_, T>,
    id: RuleId,
    level: Severity,
    message: &str,
    condition: Option<RuleId>,
    start: usize,
) -> MatchResult {
    let span = match condition {
        Some(condition) => {
            let result = matcher.parse(condition, start)?;
            if !result.success {
                return Ok(ParseResult::success(0, Vec::new()));
            }
            result.span(start)
        }
        None => Span::empty(start),
    };

    if level == Severity::Fatal {
        return Err(ParseAbort::Fatal {
            message: message.to_string(),
            span,
        });
    }

    log::debug!("{level} logged by {} at {span}: {message}", matcher.graph().display_name(id));
    Ok(ParseResult::success(0, vec![Annotation::leaf(id, span)]))
}

/// A log annotation found in a parse tree, with its rule's level and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub rule: RuleId,
    pub level: Severity,
    pub message: CompactString,
    /// In elements of the input the log was matched over
    pub span: Span,
}

/// Every log annotation in `annotations` and their descendants, in pre-order.
#[must_use]
pub fn collect_logs<T: Element>(graph: &RuleGraph<T>, annotations: &[Annotation]) -> Vec<LogEntry> {
    annotations
        .iter()
        .flat_map(Annotation::descendants)
        .filter_map(|annotation| match graph.rule(annotation.rule()).map(|r| r.kind()) {
            Some(RuleKind::Log { level, message, .. }) => Some(LogEntry {
                rule: annotation.rule(),
                level: *level,
                message: message.clone(),
                span: annotation.span(),
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GraphBuilder, RuleDef, RuleGraph};

    fn skip_graph(stop_before: bool, fail_on_eof: bool) -> (RuleGraph<char>, RuleId) {
        let mut b = GraphBuilder::new();
        let bar = b.add(RuleDef::text("bar"));
        let skip = b.add(RuleDef::skip(bar, stop_before, fail_on_eof));
        b.set_root(skip);
        (b.finish().unwrap(), bar)
    }

    fn run(graph: &RuleGraph<char>, text: &str) -> ParseResult {
        let input: Vec<char> = text.chars().collect();
        graph.parse(&input).unwrap()
    }

    #[test]
    fn test_skip_stop_before() {
        let (graph, _) = skip_graph(true, false);
        let result = run(&graph, "xxxbar");
        assert!(result.success);
        assert_eq!(result.len, 3);
        assert!(result.annotations[0].is_leaf());
    }

    #[test]
    fn test_skip_stop_after() {
        let (graph, bar) = skip_graph(false, false);
        let result = run(&graph, "xxxbar");
        assert!(result.success);
        assert_eq!(result.len, 6);
        assert_eq!(result.annotations[0].children()[0].rule(), bar);
    }

    #[test]
    fn test_skip_end_of_input() {
        let (graph, _) = skip_graph(true, false);
        let result = run(&graph, "xxx");
        assert!(result.success);
        assert_eq!(result.len, 3);

        let (graph, _) = skip_graph(true, true);
        assert!(!run(&graph, "xxx").success);
    }

    #[test]
    fn test_find() {
        let mut b = GraphBuilder::new();
        let semi = b.add(RuleDef::single(';'));
        let find = b.add(RuleDef::find(semi));
        b.set_root(find);
        let graph = b.finish().unwrap();
        assert_eq!(run(&graph, "ab;").len, 2);
        assert!(!run(&graph, "ab").success);
    }

    #[test]
    fn test_log_condition() {
        let mut b = GraphBuilder::new();
        let x = b.add(RuleDef::text("xy"));
        let warn = b.add(RuleDef::log_if(Severity::Warning, "xy ahead", x));
        b.set_root(warn);
        let graph = b.finish().unwrap();

        let hit = run(&graph, "xy");
        assert!(hit.success);
        assert_eq!(hit.len, 0);
        assert_eq!(hit.annotations, vec![Annotation::leaf(warn, Span::new(0, 2))]);

        let miss = run(&graph, "ab");
        assert!(miss.success);
        assert!(miss.annotations.is_empty());

        let logs = collect_logs(&graph, &hit.annotations);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, Severity::Warning);
        assert_eq!(logs[0].message, "xy ahead");
    }

    #[test]
    fn test_fatal_aborts() {
        let mut b = GraphBuilder::new();
        let a = b.add(RuleDef::single('a'));
        let fatal = b.add(RuleDef::log(Severity::Fatal, "cannot continue"));
        let seq = b.add(RuleDef::sequence([a, fatal]));
        b.set_root(seq);
        let graph = b.finish().unwrap();

        let input: Vec<char> = "ab".chars().collect();
        let abort = graph.parse(&input).unwrap_err();
        assert_eq!(
            abort,
            ParseAbort::Fatal {
                message: "cannot continue".into(),
                span: Span::empty(1),
            }
        );
    }
}
