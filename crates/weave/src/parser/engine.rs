//! # Matching Engine
//!
//! [`Matcher`] walks a rule graph recursively, one call frame per rule. Each
//! rule produces its default annotation shape, then its pruning policy is
//! applied before the result reaches the parent.

use crate::error::ParseAbort;
use crate::grammar::{Element, Pruning, Rule, RuleGraph, RuleId, RuleKind};
use crate::parser::{MatchResult, ParseConfig, ParseResult, evaluation, recovery};
use crate::syntax::{Annotation, Span};

/// Matching state for one run over one input.
pub struct Matcher<'g, 'i, T> {
    graph: &'g RuleGraph<T>,
    input: &'i [T],
    config: ParseConfig,
    depth: usize,
    farthest: usize,
}

impl<'g, 'i, T: Element> Matcher<'g, 'i, T> {
    #[must_use]
    pub const fn new(graph: &'g RuleGraph<T>, input: &'i [T], config: ParseConfig) -> Self {
        Self {
            graph,
            input,
            config,
            depth: 0,
            farthest: 0,
        }
    }

    #[must_use]
    pub const fn graph(&self) -> &'g RuleGraph<T> {
        self.graph
    }

    #[must_use]
    pub const fn input(&self) -> &'i [T] {
        self.input
    }

    /// Furthest position at which an element-level match failed.
    #[must_use]
    pub const fn farthest(&self) -> usize {
        self.farthest
    }

    /// Match rule `id` at `start`, with its pruning applied.
    ///
    /// # Errors
    ///
    /// Returns [`ParseAbort`] when a fatal log rule fires, a reference was
    /// never resolved, or nesting exceeds [`ParseConfig::max_depth`].
    pub fn parse(&mut self, id: RuleId, start: usize) -> MatchResult {
        let graph = self.graph;
        let Some(rule) = graph.rule(id) else {
            log::error!("rule {id} is not part of the graph being matched");
            return Ok(ParseResult::failure());
        };

        if self.depth >= self.config.max_depth {
            return Err(ParseAbort::DepthExceeded {
                limit: self.config.max_depth,
                position: start,
            });
        }

        self.depth += 1;
        let result = self.match_rule(rule, start);
        self.depth -= 1;

        let mut result = result?;
        if result.success && rule.pruning() != Pruning::None {
            result.annotations = prune(graph, rule.pruning(), result.annotations);
        }
        Ok(result)
    }

    fn match_rule(&mut self, rule: &'g Rule<T>, start: usize) -> MatchResult {
        let id = rule.id();
        let input = self.input;
        let rest = input.get(start..).unwrap_or(&[]);

        match rule.kind() {
            RuleKind::Any { min, max } => {
                if rest.len() < *min {
                    return Ok(self.fail_at(input.len()));
                }
                let len = if *max == 0 { rest.len() } else { rest.len().min(*max) };
                Ok(leaf(id, start, len))
            }
            RuleKind::Single(value) => Ok(match rest.first() {
                Some(element) if element == value => leaf(id, start, 1),
                _ => self.fail_at(start),
            }),
            RuleKind::Set(values) => Ok(match rest.first() {
                Some(element) if values.contains(element) => leaf(id, start, 1),
                _ => self.fail_at(start),
            }),
            RuleKind::Range { lo, hi } => Ok(match rest.first() {
                Some(element) if lo <= element && element <= hi => leaf(id, start, 1),
                _ => self.fail_at(start),
            }),
            RuleKind::Literal(values) => {
                if rest.starts_with(values) {
                    Ok(leaf(id, start, values.len()))
                } else {
                    let matched = rest.iter().zip(values.iter()).take_while(|(a, b)| a == b).count();
                    Ok(self.fail_at(start + matched))
                }
            }
            RuleKind::Sequence(subs) => {
                let mut pos = start;
                let mut children = Vec::new();
                for &sub in subs {
                    let result = self.parse(sub, pos)?;
                    if !result.success {
                        return Ok(ParseResult::failure());
                    }
                    pos += result.len;
                    children.extend(result.annotations);
                }
                Ok(node(id, start, pos - start, children))
            }
            RuleKind::OneOf(subs) => {
                for &sub in subs {
                    let result = self.parse(sub, start)?;
                    if result.success {
                        return Ok(node(id, start, result.len, result.annotations));
                    }
                }
                Ok(ParseResult::failure())
            }
            RuleKind::Count { sub, min, max } => self.repeat(rule, *sub, *min, *max, start),
            RuleKind::Not(sub) => {
                let result = self.parse(*sub, start)?;
                Ok(if result.success {
                    ParseResult::failure()
                } else {
                    ParseResult::success(0, Vec::new())
                })
            }
            RuleKind::Condition(sub) => {
                let result = self.parse(*sub, start)?;
                Ok(if result.success {
                    ParseResult::success(0, result.annotations)
                } else {
                    ParseResult::failure()
                })
            }
            RuleKind::Skip {
                stop,
                stop_before,
                fail_on_eof,
            } => recovery::skip(self, id, *stop, *stop_before, *fail_on_eof, start),
            RuleKind::Log {
                level,
                message,
                condition,
            } => recovery::log(self, id, *level, message, *condition, start),
            RuleKind::BreakPoint(sub) => {
                if cfg!(debug_assertions) {
                    log::trace!(
                        "breakpoint {} at {start}: entering {}",
                        rule.display_name(),
                        self.graph.display_name(*sub)
                    );
                }
                let result = self.parse(*sub, start)?;
                if cfg!(debug_assertions) {
                    log::trace!(
                        "breakpoint {} at {start}: success={} len={}",
                        rule.display_name(),
                        result.success,
                        result.len
                    );
                }
                Ok(result)
            }
            RuleKind::Evaluation(alternatives) => evaluation::evaluate(self, id, alternatives, start),
            RuleKind::Reference { target, subject } => match subject {
                Some(subject) => self.parse(*subject, start),
                None => Err(ParseAbort::UnresolvedReference {
                    name: target.to_string(),
                }),
            },
        }
    }

    fn repeat(&mut self, rule: &Rule<T>, sub: RuleId, min: usize, max: usize, start: usize) -> MatchResult {
        let mut pos = start;
        let mut reps = 0;
        let mut children = Vec::new();

        while max == 0 || reps < max {
            let result = self.parse(sub, pos)?;
            if !result.success {
                break;
            }
            reps += 1;
            children.extend(result.annotations);

            if result.len == 0 {
                if max == 0 {
                    log::warn!(
                        "unbounded repetition {} matched an empty span at {pos}; failing",
                        rule.display_name()
                    );
                    return Ok(ParseResult::failure());
                }
                // Further repetitions would match the same empty span.
                reps = reps.max(min);
                break;
            }
            pos += result.len;
        }

        if reps < min {
            return Ok(ParseResult::failure());
        }
        Ok(node(rule.id(), start, pos - start, children))
    }

    fn fail_at(&mut self, position: usize) -> ParseResult {
        self.farthest = self.farthest.max(position);
        ParseResult::failure()
    }
}

fn leaf(id: RuleId, start: usize, len: usize) -> ParseResult {
    ParseResult::success(len, vec![Annotation::leaf(id, Span::new(start, len))])
}

fn node(id: RuleId, start: usize, len: usize, children: Vec<Annotation>) -> ParseResult {
    ParseResult::success(len, vec![Annotation::new(id, Span::new(start, len), children)])
}

/// Apply `pruning` to a rule's annotation list.
///
/// Log annotations are diagnostics, so they survive every policy: subtrees
/// dropped by `All` or `Children` give up their log annotations to the
/// pruned position.
pub fn prune<T: Element>(graph: &RuleGraph<T>, pruning: Pruning, annotations: Vec<Annotation>) -> Vec<Annotation> {
    match pruning {
        Pruning::None => annotations,
        Pruning::Root => {
            let mut out = Vec::with_capacity(annotations.len());
            for annotation in annotations {
                if graph.is_log(annotation.rule()) {
                    out.push(annotation);
                } else {
                    out.extend(annotation.into_children());
                }
            }
            out
        }
        Pruning::All => {
            let mut logs = Vec::new();
            for annotation in annotations {
                hoist_logs(graph, annotation, &mut logs);
            }
            logs
        }
        Pruning::Children => annotations
            .into_iter()
            .map(|annotation| {
                if graph.is_log(annotation.rule()) {
                    return annotation;
                }
                let (rule, span, children) = annotation.into_parts();
                let mut logs = Vec::new();
                for child in children {
                    hoist_logs(graph, child, &mut logs);
                }
                Annotation::new(rule, span, logs)
            })
            .collect(),
    }
}

fn hoist_logs<T: Element>(graph: &RuleGraph<T>, annotation: Annotation, out: &mut Vec<Annotation>) {
    if graph.is_log(annotation.rule()) {
        out.push(annotation);
        return;
    }
    for child in annotation.into_children() {
        hoist_logs(graph, child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Severity;
    use crate::grammar::{GraphBuilder, RuleDef};

    fn chars(text: &str) -> Vec<char> {
        text.chars().collect()
    }

    fn run(builder: GraphBuilder<char>, root: RuleId, text: &str) -> ParseResult {
        let mut builder = builder;
        builder.set_root(root);
        let graph = builder.finish().unwrap();
        graph.parse(&chars(text)).unwrap()
    }

    #[test]
    fn test_any_bounds() {
        let mut b = GraphBuilder::new();
        let any = b.add(RuleDef::any_between(2, 3));
        let result = run(b, any, "abcdef");
        assert!(result.success);
        assert_eq!(result.len, 3);

        let mut b = GraphBuilder::new();
        let any = b.add(RuleDef::any_between(2, 0));
        assert!(!run(b, any, "a").success);
    }

    #[test]
    fn test_terminals() {
        let mut b = GraphBuilder::new();
        let a = b.add(RuleDef::single('a'));
        let set = b.add(RuleDef::set(['x', 'y']));
        let digit = b.add(RuleDef::range('0', '9'));
        let lit = b.add(RuleDef::text("ok"));
        let seq = b.add(RuleDef::sequence([a, set, digit, lit]));
        let result = run(b, seq, "ay7ok");
        assert!(result.success);
        assert_eq!(result.len, 5);
        assert_eq!(result.annotations.len(), 1);
        assert_eq!(result.annotations[0].children().len(), 4);
    }

    #[test]
    fn test_literal_is_atomic() {
        let mut b = GraphBuilder::new();
        let lit = b.add(RuleDef::text("abc"));
        let result = run(b, lit, "abx");
        assert!(!result.success);
        assert_eq!(result.len, 0);
    }

    #[test]
    fn test_sequence_failure_consumes_nothing() {
        let mut b = GraphBuilder::new();
        let a = b.add(RuleDef::single('a'));
        let c = b.add(RuleDef::single('c'));
        let seq = b.add(RuleDef::sequence([a, c]));
        let result = run(b, seq, "ab");
        assert_eq!(result, ParseResult::failure());
    }

    #[test]
    fn test_one_of_first_match_wins() {
        let mut b = GraphBuilder::new();
        let short = b.add(RuleDef::text("a"));
        let long = b.add(RuleDef::text("ab"));
        let choice = b.add(RuleDef::one_of([short, long]));
        let result = run(b, choice, "ab");
        assert!(result.success);
        assert_eq!(result.len, 1);
        assert_eq!(result.annotations[0].children()[0].rule(), short);
    }

    #[test]
    fn test_count_bounds() {
        let mut b = GraphBuilder::new();
        let a = b.add(RuleDef::single('a'));
        let count = b.add(RuleDef::count(a, 2, 3));
        let result = run(b, count, "aaaa");
        assert!(result.success);
        assert_eq!(result.len, 3);

        let mut b = GraphBuilder::new();
        let a = b.add(RuleDef::single('a'));
        let count = b.add(RuleDef::count(a, 2, 3));
        assert!(!run(b, count, "ab").success);
    }

    #[test]
    fn test_unbounded_count_over_empty_match_fails() {
        let mut b = GraphBuilder::new();
        let empty = b.add(RuleDef::text(""));
        let count = b.add(RuleDef::count(empty, 0, 0));
        b.set_root(count);
        let graph = b.finish_unchecked().unwrap();
        let result = graph.parse(&chars("abc")).unwrap();
        assert!(!result.success);
    }

    #[test]
    fn test_lookahead_is_zero_width() {
        let mut b = GraphBuilder::new();
        let a = b.add(RuleDef::single('a'));
        let not_a = b.add(RuleDef::not(a));
        let if_a = b.add(RuleDef::condition(a));
        let contradiction = b.add(RuleDef::sequence([if_a, not_a]));
        assert!(!run(b, contradiction, "a").success);

        let mut b = GraphBuilder::new();
        let a = b.add(RuleDef::single('a'));
        let if_a = b.add(RuleDef::condition(a));
        let result = run(b, if_a, "a");
        assert!(result.success);
        assert_eq!(result.len, 0);
        assert_eq!(result.annotations.len(), 1);
    }

    #[test]
    fn test_pruning_hoists_logs() {
        let mut b = GraphBuilder::new();
        let a = b.add(RuleDef::single('a'));
        let warn = b.add(RuleDef::log(Severity::Warning, "saw a"));
        let seq = b.add(RuleDef::sequence([a, warn]).pruning(Pruning::All));
        let result = run(b, seq, "a");
        assert!(result.success);
        assert_eq!(result.annotations.len(), 1);
        assert_eq!(result.annotations[0].rule(), warn);
    }

    #[test]
    fn test_depth_limit() {
        let mut b = GraphBuilder::new();
        let r = b.reference("loop");
        let looping = b.define("loop", RuleDef::sequence([r]));
        b.set_root(looping);
        let graph = b.finish_unchecked().unwrap();
        let error = graph
            .parse_with(&chars("x"), ParseConfig { max_depth: 16 })
            .unwrap_err();
        assert!(matches!(error, ParseAbort::DepthExceeded { limit: 16, .. }));
    }

    #[test]
    fn test_farthest_failure() {
        let mut b = GraphBuilder::new();
        let lit = b.add(RuleDef::text("abcd"));
        b.set_root(lit);
        let graph = b.finish().unwrap();
        let input = chars("abxd");
        let mut matcher = Matcher::new(&graph, &input, ParseConfig::default());
        assert!(!matcher.parse(lit, 0).unwrap().success);
        assert_eq!(matcher.farthest(), 2);
    }
}
