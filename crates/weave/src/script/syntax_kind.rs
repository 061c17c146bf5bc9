//! Node kinds of the script syntax tree.

use crate::grammar::{RuleGraph, RuleId};
use hashbrown::HashMap;
use std::fmt;

/// Every annotation the script grammar can produce outside of log
/// annotations. Each kind corresponds to one named rule of the bootstrap
/// grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    // Nodes
    Script,
    Include,
    Rule,
    Header,
    Choice,
    Evaluation,
    Sequence,
    Unary,
    Count,
    Bounds,
    Not,
    Condition,
    Skip,
    Log,
    Group,
    Set,
    SetItem,

    // Tokens
    Ident,
    String,
    Integer,
    Prune,
    Dot,
    DotDot,
    Star,
    Plus,
    Question,
    KwFind,
    KwStopAt,
    KwStopAfter,
    KwError,
    KwWarning,
    KwInfo,
    KwDebug,
    KwFatal,
}

impl SyntaxKind {
    pub const ALL: [Self; 34] = [
        Self::Script,
        Self::Include,
        Self::Rule,
        Self::Header,
        Self::Choice,
        Self::Evaluation,
        Self::Sequence,
        Self::Unary,
        Self::Count,
        Self::Bounds,
        Self::Not,
        Self::Condition,
        Self::Skip,
        Self::Log,
        Self::Group,
        Self::Set,
        Self::SetItem,
        Self::Ident,
        Self::String,
        Self::Integer,
        Self::Prune,
        Self::Dot,
        Self::DotDot,
        Self::Star,
        Self::Plus,
        Self::Question,
        Self::KwFind,
        Self::KwStopAt,
        Self::KwStopAfter,
        Self::KwError,
        Self::KwWarning,
        Self::KwInfo,
        Self::KwDebug,
        Self::KwFatal,
    ];

    /// Name of the bootstrap rule producing this kind.
    #[must_use]
    pub const fn rule_name(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Include => "include",
            Self::Rule => "rule",
            Self::Header => "header",
            Self::Choice => "choice",
            Self::Evaluation => "evaluation",
            Self::Sequence => "sequence",
            Self::Unary => "unary",
            Self::Count => "count",
            Self::Bounds => "bounds",
            Self::Not => "not",
            Self::Condition => "condition",
            Self::Skip => "skip",
            Self::Log => "log",
            Self::Group => "group",
            Self::Set => "set",
            Self::SetItem => "set_item",
            Self::Ident => "ident",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Prune => "prune",
            Self::Dot => "dot",
            Self::DotDot => "dotdot",
            Self::Star => "star",
            Self::Plus => "plus",
            Self::Question => "question",
            Self::KwFind => "kw_find",
            Self::KwStopAt => "kw_stop_at",
            Self::KwStopAfter => "kw_stop_after",
            Self::KwError => "kw_error",
            Self::KwWarning => "kw_warning",
            Self::KwInfo => "kw_info",
            Self::KwDebug => "kw_debug",
            Self::KwFatal => "kw_fatal",
        }
    }

    #[must_use]
    pub const fn is_token(self) -> bool {
        matches!(
            self,
            Self::Ident
                | Self::String
                | Self::Integer
                | Self::Prune
                | Self::Dot
                | Self::DotDot
                | Self::Star
                | Self::Plus
                | Self::Question
                | Self::KwFind
                | Self::KwStopAt
                | Self::KwStopAfter
                | Self::KwError
                | Self::KwWarning
                | Self::KwInfo
                | Self::KwDebug
                | Self::KwFatal
        )
    }
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rule_name())
    }
}

/// Lookup from bootstrap grammar rule ids to syntax kinds.
#[derive(Debug, Clone, Default)]
pub struct SyntaxKindTable {
    kinds: HashMap<RuleId, SyntaxKind>,
}

impl SyntaxKindTable {
    /// Map every kind to the rule of `grammar` with the same name. Returns
    /// the kinds that have no rule.
    #[must_use]
    pub fn build<T: crate::grammar::Element>(grammar: &RuleGraph<T>) -> (Self, Vec<SyntaxKind>) {
        let mut kinds = HashMap::with_capacity(SyntaxKind::ALL.len());
        let mut missing = Vec::new();
        for kind in SyntaxKind::ALL {
            match grammar.id_of(kind.rule_name()) {
                Some(id) => {
                    kinds.insert(id, kind);
                }
                None => missing.push(kind),
            }
        }
        (Self { kinds }, missing)
    }

    #[must_use]
    pub fn get(&self, rule: RuleId) -> Option<SyntaxKind> {
        self.kinds.get(&rule).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashSet;

    #[test]
    fn test_rule_names_are_unique() {
        let names: HashSet<&str> = SyntaxKind::ALL.iter().map(|k| k.rule_name()).collect();
        assert_eq!(names.len(), SyntaxKind::ALL.len());
    }

    #[test]
    fn test_token_kinds() {
        assert!(SyntaxKind::Ident.is_token());
        assert!(!SyntaxKind::Rule.is_token());
        assert_eq!(SyntaxKind::KwStopAfter.to_string(), "kw_stop_after");
    }
}
