//! Rule definitions: the closed set of matching primitives.

use crate::error::Severity;
use crate::grammar::{Element, Pruning, RuleId};
use compact_str::CompactString;
use smallvec::SmallVec;
use std::borrow::Cow;

/// Sub-rule list of a composite rule.
pub type RuleIds = SmallVec<[RuleId; 4]>;

/// The matching primitive a rule evaluates.
///
/// Composite variants hold the ids of their sub-rules in the same graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind<T> {
    /// At least `min` elements, at most `max` (0 = unbounded)
    Any { min: usize, max: usize },
    /// Exactly this element
    Single(T),
    /// Any element of the set
    Set(SmallVec<[T; 8]>),
    /// Any element in `lo..=hi`
    Range { lo: T, hi: T },
    /// This exact run of elements
    Literal(SmallVec<[T; 8]>),
    /// All sub-rules, consecutively
    Sequence(RuleIds),
    /// The first sub-rule that matches
    OneOf(RuleIds),
    /// Greedy repetition, `max` 0 = unbounded
    Count { sub: RuleId, min: usize, max: usize },
    /// Zero-width negative lookahead
    Not(RuleId),
    /// Zero-width positive lookahead
    Condition(RuleId),
    /// Advance until `stop` matches
    Skip {
        stop: RuleId,
        stop_before: bool,
        fail_on_eof: bool,
    },
    /// Zero-width diagnostic record, optionally guarded by `condition`
    Log {
        level: Severity,
        message: CompactString,
        condition: Option<RuleId>,
    },
    /// Transparent passthrough used as a debugging hook
    BreakPoint(RuleId),
    /// Precedence-climbing chain over binary-operator alternatives
    Evaluation(RuleIds),
    /// Placeholder resolved by name to `subject`
    Reference {
        target: CompactString,
        subject: Option<RuleId>,
    },
}

impl<T: Element> RuleKind<T> {
    /// Ids of every rule this one points at, in declaration order.
    #[must_use]
    pub fn sub_rules(&self) -> RuleIds {
        let mut ids = RuleIds::new();
        match self {
            Self::Any { .. }
            | Self::Single(_)
            | Self::Set(_)
            | Self::Range { .. }
            | Self::Literal(_) => {}
            Self::Sequence(subs) | Self::OneOf(subs) | Self::Evaluation(subs) => {
                ids.extend(subs.iter().copied());
            }
            Self::Count { sub, .. }
            | Self::Not(sub)
            | Self::Condition(sub)
            | Self::BreakPoint(sub)
            | Self::Skip { stop: sub, .. } => ids.push(*sub),
            Self::Log { condition, .. } => ids.extend(condition.iter().copied()),
            Self::Reference { subject, .. } => ids.extend(subject.iter().copied()),
        }
        ids
    }

    /// Apply `f` to every outgoing edge.
    pub fn for_each_sub_rule_mut(&mut self, mut f: impl FnMut(&mut RuleId)) {
        match self {
            Self::Any { .. }
            | Self::Single(_)
            | Self::Set(_)
            | Self::Range { .. }
            | Self::Literal(_) => {}
            Self::Sequence(subs) | Self::OneOf(subs) | Self::Evaluation(subs) => {
                subs.iter_mut().for_each(f);
            }
            Self::Count { sub, .. }
            | Self::Not(sub)
            | Self::Condition(sub)
            | Self::BreakPoint(sub)
            | Self::Skip { stop: sub, .. } => f(sub),
            Self::Log { condition, .. } => {
                if let Some(condition) = condition {
                    f(condition);
                }
            }
            Self::Reference { subject, .. } => {
                if let Some(subject) = subject {
                    f(subject);
                }
            }
        }
    }

    /// Short lowercase name of the primitive.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Any { .. } => "any",
            Self::Single(_) => "single",
            Self::Set(_) => "set",
            Self::Range { .. } => "range",
            Self::Literal(_) => "literal",
            Self::Sequence(_) => "sequence",
            Self::OneOf(_) => "one_of",
            Self::Count { .. } => "count",
            Self::Not(_) => "not",
            Self::Condition(_) => "condition",
            Self::Skip { .. } => "skip",
            Self::Log { .. } => "log",
            Self::BreakPoint(_) => "breakpoint",
            Self::Evaluation(_) => "evaluation",
            Self::Reference { .. } => "reference",
        }
    }

    /// Leaf matchers consume input without sub-rules.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Any { .. } | Self::Single(_) | Self::Set(_) | Self::Range { .. } | Self::Literal(_)
        )
    }

    /// Transparent rules pass their sub-rule's annotations through instead of
    /// wrapping them in a node of their own.
    #[must_use]
    pub const fn is_transparent(&self) -> bool {
        matches!(
            self,
            Self::Reference { .. } | Self::Condition(_) | Self::BreakPoint(_) | Self::Evaluation(_)
        )
    }
}

/// A registered rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule<T> {
    pub(crate) id: RuleId,
    pub(crate) name: Option<CompactString>,
    pub(crate) pruning: Pruning,
    pub(crate) precedence: i32,
    pub(crate) kind: RuleKind<T>,
}

impl<T: Element> Rule<T> {
    #[must_use]
    pub const fn id(&self) -> RuleId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The rule's name, or `kind#id` for anonymous rules.
    #[must_use]
    pub fn display_name(&self) -> Cow<'_, str> {
        match &self.name {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(format!("{}{}", self.kind.kind_name(), self.id)),
        }
    }

    #[must_use]
    pub const fn pruning(&self) -> Pruning {
        self.pruning
    }

    #[must_use]
    pub const fn precedence(&self) -> i32 {
        self.precedence
    }

    #[must_use]
    pub const fn kind(&self) -> &RuleKind<T> {
        &self.kind
    }
}

/// A rule waiting for registration; [`RuleGraph::register`](crate::grammar::RuleGraph::register)
/// assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDef<T> {
    pub name: Option<CompactString>,
    pub pruning: Pruning,
    pub precedence: i32,
    pub kind: RuleKind<T>,
}

impl<T: Element> RuleDef<T> {
    #[must_use]
    pub const fn new(kind: RuleKind<T>) -> Self {
        Self {
            name: None,
            pruning: Pruning::None,
            precedence: 0,
            kind,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<CompactString>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub const fn pruning(mut self, pruning: Pruning) -> Self {
        self.pruning = pruning;
        self
    }

    #[must_use]
    pub const fn precedence(mut self, precedence: i32) -> Self {
        self.precedence = precedence;
        self
    }

    /// Exactly one element of any value.
    #[must_use]
    pub const fn any() -> Self {
        Self::any_between(1, 1)
    }

    #[must_use]
    pub const fn any_between(min: usize, max: usize) -> Self {
        Self::new(RuleKind::Any { min, max })
    }

    #[must_use]
    pub const fn single(value: T) -> Self {
        Self::new(RuleKind::Single(value))
    }

    #[must_use]
    pub fn set(values: impl IntoIterator<Item = T>) -> Self {
        let mut values: SmallVec<[T; 8]> = values.into_iter().collect();
        values.sort_unstable();
        values.dedup();
        Self::new(RuleKind::Set(values))
    }

    #[must_use]
    pub const fn range(lo: T, hi: T) -> Self {
        Self::new(RuleKind::Range { lo, hi })
    }

    #[must_use]
    pub fn literal(values: impl IntoIterator<Item = T>) -> Self {
        Self::new(RuleKind::Literal(values.into_iter().collect()))
    }

    #[must_use]
    pub fn sequence(subs: impl IntoIterator<Item = RuleId>) -> Self {
        Self::new(RuleKind::Sequence(subs.into_iter().collect()))
    }

    #[must_use]
    pub fn one_of(subs: impl IntoIterator<Item = RuleId>) -> Self {
        Self::new(RuleKind::OneOf(subs.into_iter().collect()))
    }

    #[must_use]
    pub const fn count(sub: RuleId, min: usize, max: usize) -> Self {
        Self::new(RuleKind::Count { sub, min, max })
    }

    #[must_use]
    pub const fn optional(sub: RuleId) -> Self {
        Self::count(sub, 0, 1)
    }

    #[must_use]
    pub const fn not(sub: RuleId) -> Self {
        Self::new(RuleKind::Not(sub))
    }

    #[must_use]
    pub const fn condition(sub: RuleId) -> Self {
        Self::new(RuleKind::Condition(sub))
    }

    #[must_use]
    pub const fn skip(stop: RuleId, stop_before: bool, fail_on_eof: bool) -> Self {
        Self::new(RuleKind::Skip {
            stop,
            stop_before,
            fail_on_eof,
        })
    }

    /// `Skip` that stops before `stop` and fails at end of input.
    #[must_use]
    pub const fn find(stop: RuleId) -> Self {
        Self::skip(stop, true, true)
    }

    #[must_use]
    pub fn log(level: Severity, message: impl Into<CompactString>) -> Self {
        Self::new(RuleKind::Log {
            level,
            message: message.into(),
            condition: None,
        })
    }

    #[must_use]
    pub fn log_if(level: Severity, message: impl Into<CompactString>, condition: RuleId) -> Self {
        Self::new(RuleKind::Log {
            level,
            message: message.into(),
            condition: Some(condition),
        })
    }

    #[must_use]
    pub const fn breakpoint(sub: RuleId) -> Self {
        Self::new(RuleKind::BreakPoint(sub))
    }

    #[must_use]
    pub fn evaluation(alternatives: impl IntoIterator<Item = RuleId>) -> Self {
        Self::new(RuleKind::Evaluation(alternatives.into_iter().collect()))
    }

    #[must_use]
    pub fn reference(target: impl Into<CompactString>) -> Self {
        Self::new(RuleKind::Reference {
            target: target.into(),
            subject: None,
        })
    }
}

impl RuleDef<char> {
    /// Literal over the chars of `text`.
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self::literal(text.chars())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_is_sorted_and_deduplicated() {
        let def = RuleDef::set(['c', 'a', 'c', 'b']);
        assert_eq!(def.kind, RuleKind::Set(SmallVec::from_slice(&['a', 'b', 'c'])));
    }

    #[test]
    fn test_sub_rules_and_rewrite() {
        let a = RuleId::new(1);
        let b = RuleId::new(2);
        let mut kind: RuleKind<char> = RuleKind::Sequence(SmallVec::from_slice(&[a, b, a]));
        assert_eq!(kind.sub_rules().as_slice(), &[a, b, a]);

        kind.for_each_sub_rule_mut(|id| {
            if *id == a {
                *id = RuleId::new(9);
            }
        });
        assert_eq!(kind.sub_rules().as_slice(), &[RuleId::new(9), b, RuleId::new(9)]);
    }

    #[test]
    fn test_unresolved_reference_has_no_edges() {
        let def: RuleDef<char> = RuleDef::reference("foo");
        assert!(def.kind.sub_rules().is_empty());
        assert!(def.kind.is_transparent());
    }

    #[test]
    fn test_builder_methods() {
        let def = RuleDef::text("ab").named("ab").pruning(Pruning::All).precedence(3);
        assert_eq!(def.name.as_deref(), Some("ab"));
        assert_eq!(def.pruning, Pruning::All);
        assert_eq!(def.precedence, 3);
        assert!(def.kind.is_terminal());
        assert_eq!(def.kind.kind_name(), "literal");
    }
}
