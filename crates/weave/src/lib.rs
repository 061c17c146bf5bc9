//! # Weave
//!
//! A combinator-based matching engine with a self-hosted script language
//! for tokenizers and grammars.
//!
//! ## Overview
//!
//! - **Rules** are a closed set of matching primitives (literals, sets,
//!   sequences, ordered choice, repetition, lookahead, recovery) stored in a
//!   [`RuleGraph`] and addressed by [`RuleId`].
//! - **Matching** is PEG-style: the first alternative that matches wins.
//!   Each rule leaves [`Annotation`]s behind, shaped by its [`Pruning`].
//! - **Evaluation** rules fold chains of binary operators by precedence.
//! - **Recovery** rules skip malformed input and record diagnostics as log
//!   annotations in the tree instead of failing.
//! - **Scripts** declare rules textually and compile into either a
//!   char-level tokenizer or a grammar over the tokenizer's token kinds.
//!
//! ## Quick Start
//!
//! ```rust
//! use weave::pipeline::Pipeline;
//! use weave::syntax::to_sexpr_list;
//!
//! let tokenizer = "
//!     tokens = *token;
//!     -r token = ws | num | plus | star;
//!     -a ws = +' ';
//!     -c num = +{'0'..'9'};
//!     plus = '+';
//!     star = '*';
//! ";
//! let grammar = "
//!     expr = add / mult / num;
//!     add 10 = expr, '+', expr;
//!     mult 20 = expr, '*', expr;
//! ";
//!
//! let pipeline = Pipeline::from_scripts(tokenizer, grammar)?;
//! let output = pipeline.parse("1 + 2 * 3")?;
//! assert!(output.success);
//!
//! let grammar = pipeline.grammar().expect("grammar loaded");
//! assert_eq!(to_sexpr_list(&output.annotations, grammar), "add(num, mult(num, num))");
//! # Ok::<(), weave::error::PipelineError>(())
//! ```
//!
//! ## Modules
//!
//! - [`syntax`] - spans, line/column lookup, annotation trees
//! - [`grammar`] - rules, rule graphs, builders and analysis
//! - [`parser`] - the matching engine
//! - [`script`] - the script language and its compiler
//! - [`pipeline`] - compiling scripts with includes and parsing text
//! - [`error`] - error types and diagnostics

pub mod error;
pub mod grammar;
pub mod parser;
pub mod pipeline;
pub mod script;
pub mod syntax;

pub use error::{
    CompileError, CompileFailure, Diagnostic, GraphError, ParseAbort, PipelineError, Severity,
};
pub use grammar::{Element, GraphBuilder, Pruning, Rule, RuleDef, RuleGraph, RuleId, RuleKind};
pub use parser::{Matcher, ParseConfig, ParseResult, Token, Tokenized};
pub use pipeline::{ParseOutput, Pipeline, PipelineConfig};
pub use script::{Bootstrap, Compilation};
pub use syntax::{Annotation, LineIndex, Span};
