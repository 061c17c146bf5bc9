//! # Error Types
//!
//! Errors are split in two tiers.
//!
//! - **Data errors** in the text being matched are not Rust errors at all:
//!   they are log annotations embedded in the parse tree and surface as
//!   [`Diagnostic`] lists after matching.
//! - **Setup errors** come from building rule graphs and compiling scripts.
//!   [`GraphError`] covers graph invariants, [`CompileError`] covers script
//!   compilation, and [`CompileFailure`] aggregates every cause found while
//!   compiling one unit so they are reported together.
//!
//! [`ParseAbort`] is the single way a running match stops early: a fatal log
//! rule fired, or the recursion limit was hit.
//!
//! ## Diagnostics Support
//!
//! With the `diagnostics` feature enabled these types implement
//! [`miette::Diagnostic`].

pub mod diagnostics;

pub use diagnostics::{Diagnostic, DiagnosticList, Location, Severity};

use crate::grammar::RuleId;
use crate::syntax::Span;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic as MietteDiagnostic;

/// A reference whose target name is not registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingReference {
    pub name: String,
    pub suggestion: Option<String>,
}

impl fmt::Display for MissingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.name)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean '{suggestion}'?)")?;
        }
        Ok(())
    }
}

/// Rule graph invariant violations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(MietteDiagnostic))]
pub enum GraphError {
    #[error("duplicate rule name '{name}'")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(graph::duplicate_name)))]
    DuplicateName { name: String },

    #[error("rule {id} is not registered in this graph")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(graph::unknown_rule)))]
    UnknownRule { id: RuleId },

    #[error("no rule named '{name}'")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(graph::unknown_name)))]
    UnknownName { name: String },

    #[error("unresolved references: {}", join(missing))]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(graph::missing_references)))]
    MissingReferences { missing: Vec<MissingReference> },

    #[error("rule '{rule}' repeats without bound a sub-rule that can match without consuming input")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(graph::nullable_repetition)))]
    NullableRepetition { rule: String },

    #[error("graph has no root rule")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(graph::missing_root)))]
    MissingRoot,
}

impl GraphError {
    /// Names of the unresolved references, if this is a missing-reference error.
    #[must_use]
    pub fn missing_names(&self) -> Vec<&str> {
        match self {
            Self::MissingReferences { missing } => {
                missing.iter().map(|m| m.name.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// A matching run stopped before completing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(MietteDiagnostic))]
pub enum ParseAbort {
    #[error("fatal: {message}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parse::fatal)))]
    Fatal { message: String, span: Span },

    #[error("maximum rule nesting depth ({limit}) exceeded at position {position}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parse::depth_exceeded)))]
    DepthExceeded { limit: usize, position: usize },

    #[error("reference to '{name}' was never resolved")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parse::unresolved_reference)))]
    UnresolvedReference { name: String },

    #[error("graph has no root rule to start matching from")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parse::missing_root)))]
    MissingRoot,
}

impl ParseAbort {
    /// Span of the input where the abort happened.
    #[must_use]
    pub const fn span(&self) -> Option<Span> {
        match self {
            Self::Fatal { span, .. } => Some(*span),
            Self::DepthExceeded { position, .. } => Some(Span::empty(*position)),
            Self::UnresolvedReference { .. } | Self::MissingRoot => None,
        }
    }
}

/// One cause of a failed script compilation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(MietteDiagnostic))]
pub enum CompileError {
    /// The script syntax tree contains a node kind the compiler has no
    /// builder for. This is a defect in the script grammar, not in the
    /// user's script.
    #[error("no builder for syntax node '{kind}' produced by rule {rule}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(compile::unmapped_syntax_kind)))]
    UnmappedSyntaxKind { kind: String, rule: RuleId },

    /// The syntax tree does not have the shape the builder for `kind` expects.
    #[error("malformed '{kind}' node: {message}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(compile::malformed_node)))]
    MalformedNode { kind: String, message: String },

    #[error("{0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(transparent))]
    Graph(#[from] GraphError),

    #[error("rule '{rule}': {message} at {location}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(compile::invalid_rule)))]
    InvalidRule {
        rule: String,
        message: String,
        location: Location,
    },

    #[error("{0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(compile::script)))]
    Script(Diagnostic),

    #[error("script could not be parsed: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(compile::aborted)))]
    Aborted(#[from] ParseAbort),
}

/// Every error found while compiling one unit (a script or an included file).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(MietteDiagnostic))]
#[error("failed to compile {unit}: {} error(s)\n{}", errors.len(), join_lines(errors))]
pub struct CompileFailure {
    pub unit: String,
    #[cfg_attr(feature = "diagnostics", related)]
    pub errors: Vec<CompileError>,
}

impl CompileFailure {
    #[must_use]
    pub fn new(unit: impl Into<String>, errors: Vec<CompileError>) -> Self {
        Self {
            unit: unit.into(),
            errors,
        }
    }

    /// Names reported missing by any missing-reference error in this failure.
    #[must_use]
    pub fn missing_references(&self) -> Vec<&str> {
        self.errors
            .iter()
            .filter_map(|e| match e {
                CompileError::Graph(graph) => Some(graph.missing_names()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

/// Errors returned to callers of [`Pipeline`](crate::pipeline::Pipeline).
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(MietteDiagnostic))]
pub enum PipelineError {
    #[error(transparent)]
    #[cfg_attr(feature = "diagnostics", diagnostic(transparent))]
    Compile(#[from] CompileFailure),

    #[error("include '{path}' not found in search paths {searched:?}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pipeline::include_not_found)))]
    IncludeNotFound { path: String, searched: Vec<PathBuf> },

    #[error("failed to read '{}': {source}", path.display())]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pipeline::io)))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[cfg_attr(feature = "diagnostics", diagnostic(transparent))]
    Aborted(#[from] ParseAbort),

    #[error("no {phase} graph has been loaded")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pipeline::not_loaded)))]
    NotLoaded { phase: &'static str },

    #[error("parse reported {} problem(s)\n{}", diagnostics.len(), join_lines(diagnostics))]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pipeline::rejected)))]
    Rejected { diagnostics: Vec<Diagnostic> },
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_lines<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| format!("  {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_references_message_lists_all_names() {
        let error = GraphError::MissingReferences {
            missing: vec![
                MissingReference {
                    name: "foo".into(),
                    suggestion: None,
                },
                MissingReference {
                    name: "exprr".into(),
                    suggestion: Some("expr".into()),
                },
            ],
        };

        let message = error.to_string();
        assert!(message.contains("'foo'"));
        assert!(message.contains("did you mean 'expr'?"));
        assert_eq!(error.missing_names(), vec!["foo", "exprr"]);
    }

    #[test]
    fn test_compile_failure_aggregates() {
        let failure = CompileFailure::new(
            "grammar",
            vec![
                CompileError::Graph(GraphError::DuplicateName { name: "a".into() }),
                CompileError::Graph(GraphError::MissingReferences {
                    missing: vec![MissingReference {
                        name: "b".into(),
                        suggestion: None,
                    }],
                }),
            ],
        );

        let message = failure.to_string();
        assert!(message.starts_with("failed to compile grammar: 2 error(s)"));
        assert!(message.contains("duplicate rule name 'a'"));
        assert_eq!(failure.missing_references(), vec!["b"]);
    }

    #[test]
    fn test_parse_abort_span() {
        let abort = ParseAbort::Fatal {
            message: "boom".into(),
            span: Span::new(4, 2),
        };
        assert_eq!(abort.span(), Some(Span::new(4, 2)));
        assert_eq!(abort.to_string(), "fatal: boom");
    }
}
