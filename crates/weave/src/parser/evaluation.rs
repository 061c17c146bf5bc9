//! # Evaluation
//!
//! Precedence climbing over binary-operator alternatives.
//!
//! An alternative is *binary* when it reduces, through references and
//! breakpoints, to a three-element sequence `left, operator, right`. Its
//! precedence and pruning are taken from the first named rule on that chain
//! (the alternative's identity), which is also the rule every fold is
//! annotated with. Every other alternative only supplies operands.
//!
//! The input is first matched greedily as a flat chain
//! `operand (operator operand)*`, then folded: an operator of strictly
//! higher precedence than its predecessor binds its right operand first,
//! equal or lower precedence folds to the left.
//!
//! Operands that refer back to the evaluation itself (`add = expr '+' expr`
//! inside `expr = add / n`) stand for "any operand of this chain" rather than
//! a recursive match of the whole evaluation.

use crate::error::ParseAbort;
use crate::grammar::{Element, Pruning, RuleGraph, RuleId, RuleKind};
use crate::parser::engine::prune;
use crate::parser::{Matcher, MatchResult, ParseResult};
use crate::syntax::{Annotation, Span};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy)]
struct BinaryOperator {
    identity: RuleId,
    left: RuleId,
    operator: RuleId,
    right: RuleId,
    precedence: i32,
    pruning: Pruning,
}

#[derive(Debug, Clone, Copy)]
enum Alternative {
    Binary(BinaryOperator),
    Operand(RuleId),
}

/// A matched operand or a folded subtree.
struct Operand {
    span: Span,
    annotations: Vec<Annotation>,
}

/// A matched operator, with the alternative it belongs to.
struct Operator {
    binary: BinaryOperator,
    annotations: Vec<Annotation>,
}

fn classify<T: Element>(graph: &RuleGraph<T>, alternative: RuleId) -> Alternative {
    let mut current = alternative;
    let mut identity = None;

    // A reference cycle cannot be longer than the graph.
    for _ in 0..=graph.len() {
        let Some(rule) = graph.rule(current) else {
            break;
        };
        if identity.is_none() && rule.name().is_some() {
            identity = Some(current);
        }
        match rule.kind() {
            RuleKind::Reference {
                subject: Some(next), ..
            }
            | RuleKind::BreakPoint(next) => current = *next,
            RuleKind::Sequence(subs) if subs.len() == 3 => {
                let identity = identity.unwrap_or(current);
                let (precedence, pruning) = graph
                    .rule(identity)
                    .map_or((0, Pruning::None), |r| (r.precedence(), r.pruning()));
                return Alternative::Binary(BinaryOperator {
                    identity,
                    left: subs[0],
                    operator: subs[1],
                    right: subs[2],
                    precedence,
                    pruning,
                });
            }
            _ => break,
        }
    }
    Alternative::Operand(alternative)
}

/// Whether `rule` leads back to `evaluation` through references and breakpoints.
fn refers_to<T: Element>(graph: &RuleGraph<T>, rule: RuleId, evaluation: RuleId) -> bool {
    let mut current = rule;
    for _ in 0..=graph.len() {
        if current == evaluation {
            return true;
        }
        match graph.rule(current).map(|r| r.kind()) {
            Some(
                RuleKind::Reference {
                    subject: Some(next), ..
                }
                | RuleKind::BreakPoint(next),
            ) => current = *next,
            _ => return false,
        }
    }
    false
}

struct Chain<'a, 'g, 'i, T> {
    matcher: &'a mut Matcher<'g, 'i, T>,
    evaluation: RuleId,
    alternatives: SmallVec<[Alternative; 8]>,
}

impl<T: Element> Chain<'_, '_, '_, T> {
    /// First success among the binary left operands and the operand-only
    /// alternatives, in declaration order.
    fn match_operand(&mut self, start: usize) -> Result<Option<Operand>, ParseAbort> {
        let graph = self.matcher.graph();
        for index in 0..self.alternatives.len() {
            let candidate = match self.alternatives[index] {
                Alternative::Binary(binary) => binary.left,
                Alternative::Operand(id) => id,
            };
            if refers_to(graph, candidate, self.evaluation) {
                continue;
            }
            let result = self.matcher.parse(candidate, start)?;
            if result.success {
                return Ok(Some(Operand {
                    span: result.span(start),
                    annotations: result.annotations,
                }));
            }
        }
        Ok(None)
    }

    fn match_right(&mut self, binary: &BinaryOperator, start: usize) -> Result<Option<Operand>, ParseAbort> {
        if refers_to(self.matcher.graph(), binary.right, self.evaluation) {
            return self.match_operand(start);
        }
        let result = self.matcher.parse(binary.right, start)?;
        if !result.success {
            return Ok(None);
        }
        Ok(Some(Operand {
            span: result.span(start),
            annotations: result.annotations,
        }))
    }

    /// Match `operand (operator operand)*` greedily. Each step takes the
    /// first alternative whose operator and right operand both match.
    fn collect(&mut self, start: usize) -> Result<Option<(Vec<Operand>, Vec<Operator>)>, ParseAbort> {
        let Some(first) = self.match_operand(start)? else {
            return Ok(None);
        };
        let mut pos = first.span.end();
        let mut operands = vec![first];
        let mut operators = Vec::new();

        'chain: loop {
            for index in 0..self.alternatives.len() {
                let Alternative::Binary(binary) = self.alternatives[index] else {
                    continue;
                };
                let op = self.matcher.parse(binary.operator, pos)?;
                if !op.success {
                    continue;
                }
                let Some(right) = self.match_right(&binary, pos + op.len)? else {
                    continue;
                };
                if op.len + right.span.len() == 0 {
                    continue;
                }
                pos = right.span.end();
                operators.push(Operator {
                    binary,
                    annotations: op.annotations,
                });
                operands.push(right);
                continue 'chain;
            }
            break;
        }

        Ok(Some((operands, operators)))
    }
}

struct Folder {
    operands: std::vec::IntoIter<Operand>,
    operators: std::iter::Peekable<std::vec::IntoIter<Operator>>,
}

impl Folder {
    fn climb<T: Element>(&mut self, graph: &RuleGraph<T>, min_precedence: i32) -> Operand {
        let mut lhs = self.operands.next().unwrap_or(Operand {
            span: Span::default(),
            annotations: Vec::new(),
        });

        while let Some(op) = self.operators.next_if(|op| op.binary.precedence >= min_precedence) {
            let rhs = self.climb(graph, op.binary.precedence.saturating_add(1));
            let span = lhs.span.cover(rhs.span);
            let mut children = lhs.annotations;
            children.extend(op.annotations);
            children.extend(rhs.annotations);
            let folded = vec![Annotation::new(op.binary.identity, span, children)];
            lhs = Operand {
                span,
                annotations: prune(graph, op.binary.pruning, folded),
            };
        }
        lhs
    }
}

/// Match an evaluation rule at `start`.
pub(crate) fn evaluate<T: Element>(
    matcher: &mut Matcher<'_, '_, T>,
    evaluation: RuleId,
    alternatives: &[RuleId],
    start: usize,
) -> MatchResult {
    let graph = matcher.graph();
    let alternatives = alternatives.iter().map(|&alt| classify(graph, alt)).collect();
    let mut chain = Chain {
        matcher,
        evaluation,
        alternatives,
    };

    let Some((operands, operators)) = chain.collect(start)? else {
        return Ok(ParseResult::failure());
    };

    let mut folder = Folder {
        operands: operands.into_iter(),
        operators: operators.into_iter().peekable(),
    };
    let folded = folder.climb(graph, i32::MIN);
    Ok(ParseResult::success(folded.span.end() - start, folded.annotations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GraphBuilder, RuleDef};
    use crate::syntax::to_sexpr_list;

    /// `expr = add / mult / n` with `add 10 = n '+' n` and `mult 100 = n '*' n`.
    fn arithmetic(self_referential: bool) -> RuleGraph<char> {
        let mut b = GraphBuilder::new();
        let n = b.define("n", RuleDef::single('n'));
        let plus = b.add(RuleDef::single('+').pruning(Pruning::All));
        let star = b.add(RuleDef::single('*').pruning(Pruning::All));
        let operand = if self_referential { b.reference("expr") } else { n };
        let add = b.define("add", RuleDef::sequence([operand, plus, operand]).precedence(10));
        let mult = b.define("mult", RuleDef::sequence([operand, star, operand]).precedence(100));
        let add_ref = b.reference("add");
        let mult_ref = b.reference("mult");
        let n_ref = b.reference("n");
        let expr = b.define("expr", RuleDef::evaluation([add_ref, mult_ref, n_ref]));
        b.set_root(expr);
        b.finish().unwrap()
    }

    fn tree(graph: &RuleGraph<char>, text: &str) -> String {
        let input: Vec<char> = text.chars().collect();
        let result = graph.parse(&input).unwrap();
        assert!(result.success, "{text} did not match");
        assert_eq!(result.len, input.len());
        to_sexpr_list(&result.annotations, graph)
    }

    #[test]
    fn test_higher_precedence_nests_right() {
        let graph = arithmetic(false);
        assert_eq!(tree(&graph, "n+n*n"), "add(n, mult(n, n))");
    }

    #[test]
    fn test_lower_precedence_folds_left() {
        let graph = arithmetic(false);
        assert_eq!(tree(&graph, "n*n+n"), "add(mult(n, n), n)");
    }

    #[test]
    fn test_equal_precedence_is_left_associative() {
        let graph = arithmetic(false);
        assert_eq!(tree(&graph, "n+n+n"), "add(add(n, n), n)");
    }

    #[test]
    fn test_self_referential_operands() {
        let graph = arithmetic(true);
        assert_eq!(tree(&graph, "n+n*n"), "add(n, mult(n, n))");
        assert_eq!(tree(&graph, "n*n+n*n"), "add(mult(n, n), mult(n, n))");
    }

    #[test]
    fn test_single_operand() {
        let graph = arithmetic(false);
        assert_eq!(tree(&graph, "n"), "n");
    }

    #[test]
    fn test_failed_right_operand_tries_later_alternatives() {
        // `inc = n '+' '!'` shares its operator with `add` but needs a `!` operand.
        let mut b = GraphBuilder::new();
        let n = b.define("n", RuleDef::single('n'));
        let plus = b.add(RuleDef::single('+').pruning(Pruning::All));
        let bang = b.define("bang", RuleDef::single('!'));
        let inc = b.define("inc", RuleDef::sequence([n, plus, bang]).precedence(10));
        let add = b.define("add", RuleDef::sequence([n, plus, n]).precedence(10));
        let n_ref = b.reference("n");
        let expr = b.define("expr", RuleDef::evaluation([inc, add, n_ref]));
        b.set_root(expr);
        let graph = b.finish().unwrap();

        assert_eq!(tree(&graph, "n+n"), "add(n, n)");
        assert_eq!(tree(&graph, "n+!"), "inc(n, bang)");
    }

    #[test]
    fn test_dangling_operator_is_left_unconsumed() {
        let graph = arithmetic(false);
        let input: Vec<char> = "n+".chars().collect();
        let result = graph.parse(&input).unwrap();
        assert!(result.success);
        assert_eq!(result.len, 1);
    }
}
