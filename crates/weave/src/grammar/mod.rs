//! # Grammar Module
//!
//! Rules, rule graphs and static analysis.
//!
//! ## Overview
//!
//! A [`RuleGraph`] owns every [`Rule`] of one matching phase in an id-keyed
//! arena. Composite rules refer to their sub-rules by [`RuleId`]; textual
//! references ([`RuleKind::Reference`]) are placeholders resolved by name once
//! all rules are registered, which is how recursive grammars are expressed
//! without shared pointers.
//!
//! ## Usage
//!
//! ```rust
//! use weave::grammar::{GraphBuilder, Pruning, RuleDef};
//!
//! let mut builder = GraphBuilder::<char>::new();
//! let digit = builder.add(RuleDef::range('0', '9').pruning(Pruning::All));
//! let number = builder.define("number", RuleDef::count(digit, 1, 0));
//! builder.set_root(number);
//! let graph = builder.finish()?;
//!
//! let input: Vec<char> = "42".chars().collect();
//! let result = graph.parse(&input)?;
//! assert!(result.success);
//! assert_eq!(result.len, 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod analysis;
pub mod builder;
pub mod graph;
pub mod rule;

pub use analysis::{GraphMetrics, nullable_rules, nullable_table};
pub use builder::GraphBuilder;
pub use graph::{MergeReport, RuleGraph};
pub use rule::{Rule, RuleDef, RuleKind};

use std::fmt;

/// Dense identity of a rule inside its graph (its arena index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleId(u32);

impl RuleId {
    /// Placeholder handed out by [`GraphBuilder`] after a failed registration.
    pub const INVALID: Self = Self(u32::MAX);

    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Element type a graph matches over: `char` for tokenizers, [`RuleId`]
/// (token kinds) for grammars.
pub trait Element: Copy + Eq + Ord + std::hash::Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> Element for T where T: Copy + Eq + Ord + std::hash::Hash + fmt::Debug + Send + Sync + 'static {}

/// Which parts of a rule's result survive into its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Pruning {
    /// Keep the rule's own node and its children
    #[default]
    None,
    /// Drop the rule's own node, splicing its children into the parent
    Root,
    /// Drop everything
    All,
    /// Keep the rule's own node as a leaf
    Children,
}

impl Pruning {
    /// Script prefix for this pruning (`-r`, `-a`, `-c`).
    #[must_use]
    pub const fn prefix(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Root => Some("-r"),
            Self::All => Some("-a"),
            Self::Children => Some("-c"),
        }
    }

    /// Parse a script prefix.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "-r" => Some(Self::Root),
            "-a" => Some(Self::All),
            "-c" => Some(Self::Children),
            _ => None,
        }
    }
}
