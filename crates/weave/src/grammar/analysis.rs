//! # Graph Analysis
//!
//! Static properties of a rule graph:
//! - which rules can match without consuming input (nullable)
//! - size and shape metrics for reporting

use crate::grammar::{Element, RuleGraph, RuleId, RuleKind};
use hashbrown::HashSet;

/// Nullability of every rule, indexed by [`RuleId::index`].
///
/// Computed as a least fixed point, so recursive rules are only nullable
/// when some finite derivation of them is.
#[must_use]
pub fn nullable_table<T: Element>(graph: &RuleGraph<T>) -> Vec<bool> {
    let mut nullable = vec![false; graph.len()];
    let is = |table: &[bool], id: RuleId| table.get(id.index()).copied().unwrap_or(false);

    loop {
        let mut changed = false;
        for rule in graph.iter() {
            let index = rule.id().index();
            if nullable[index] {
                continue;
            }
            let now = match rule.kind() {
                RuleKind::Any { min, .. } => *min == 0,
                RuleKind::Single(_) | RuleKind::Set(_) | RuleKind::Range { .. } => false,
                RuleKind::Literal(values) => values.is_empty(),
                RuleKind::Sequence(subs) => subs.iter().all(|&sub| is(&nullable, sub)),
                RuleKind::OneOf(subs) | RuleKind::Evaluation(subs) => {
                    subs.iter().any(|&sub| is(&nullable, sub))
                }
                RuleKind::Count { sub, min, .. } => *min == 0 || is(&nullable, *sub),
                RuleKind::Not(_) | RuleKind::Condition(_) | RuleKind::Log { .. } => true,
                RuleKind::Skip {
                    stop,
                    stop_before,
                    fail_on_eof,
                } => *stop_before || !*fail_on_eof || is(&nullable, *stop),
                RuleKind::BreakPoint(sub) => is(&nullable, *sub),
                RuleKind::Reference { subject, .. } => subject.is_some_and(|s| is(&nullable, s)),
            };
            if now {
                nullable[index] = true;
                changed = true;
            }
        }
        if !changed {
            return nullable;
        }
    }
}

/// Ids of every rule that can succeed without consuming input.
#[must_use]
pub fn nullable_rules<T: Element>(graph: &RuleGraph<T>) -> HashSet<RuleId> {
    nullable_table(graph)
        .into_iter()
        .enumerate()
        .filter(|(_, nullable)| *nullable)
        .map(|(index, _)| RuleId::from_index(index))
        .collect()
}

/// Size and shape of a rule graph.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GraphMetrics {
    /// Total number of rules
    pub rule_count: usize,
    /// Rules with a name
    pub named_count: usize,
    /// Reference placeholders
    pub reference_count: usize,
    /// References without a subject
    pub unresolved_count: usize,
    /// Rules reachable from the root
    pub reachable_count: usize,
    /// Rules that can match without consuming input
    pub nullable_count: usize,
    /// Log rules
    pub log_count: usize,
    /// Widest ordered choice or evaluation
    pub max_alternatives: usize,
}

impl GraphMetrics {
    #[must_use]
    pub fn compute<T: Element>(graph: &RuleGraph<T>) -> Self {
        let mut metrics = Self {
            rule_count: graph.len(),
            reachable_count: graph.reachable().iter().filter(|r| **r).count(),
            nullable_count: nullable_table(graph).iter().filter(|n| **n).count(),
            ..Self::default()
        };

        for rule in graph.iter() {
            if rule.name().is_some() {
                metrics.named_count += 1;
            }
            match rule.kind() {
                RuleKind::Reference { subject, .. } => {
                    metrics.reference_count += 1;
                    if subject.is_none() {
                        metrics.unresolved_count += 1;
                    }
                }
                RuleKind::OneOf(subs) | RuleKind::Evaluation(subs) => {
                    metrics.max_alternatives = metrics.max_alternatives.max(subs.len());
                }
                RuleKind::Log { .. } => metrics.log_count += 1,
                _ => {}
            }
        }
        metrics
    }

    /// One-line description.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} rules ({} named, {} reachable), {} references ({} unresolved), {} nullable, {} log rules, widest choice {}",
            self.rule_count,
            self.named_count,
            self.reachable_count,
            self.reference_count,
            self.unresolved_count,
            self.nullable_count,
            self.log_count,
            self.max_alternatives
        )
    }
}
