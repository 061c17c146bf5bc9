//! # Syntax Module
//!
//! Spans, line/column lookup and the annotation tree produced by matching.
//!
//! - [`Span`]: `[start, len)` over the matched sequence
//! - [`Annotation`]: parse-tree node (rule identity, span, children)
//! - [`LineIndex`]: char offset to line/column conversion
//! - [`pretty`]: s-expression and outline rendering

pub mod annotation;
pub mod line_col;
pub mod pretty;
pub mod text;

pub use annotation::{Annotation, Descendants};
pub use line_col::{LineCol, LineIndex};
pub use pretty::{RuleNames, TreePrinter, to_sexpr, to_sexpr_list};
pub use text::Span;
