//! # Tree Rendering
//!
//! Compact textual forms of annotation trees. `to_sexpr` produces the
//! one-line `add(n, mult(n, n))` form used throughout the tests; the
//! [`TreePrinter`] produces an indented outline with spans, optionally
//! showing the matched source text of leaves.

use crate::grammar::RuleId;
use crate::syntax::{Annotation, Span};
use std::borrow::Cow;
use std::fmt::Write;

/// Lookup of display names for rule ids.
pub trait RuleNames {
    fn rule_name(&self, id: RuleId) -> Cow<'_, str>;
}

/// Render an annotation as `name(child, child, ...)`; leaves render as `name`.
#[must_use]
pub fn to_sexpr(annotation: &Annotation, names: &impl RuleNames) -> String {
    let mut out = String::new();
    write_sexpr(&mut out, annotation, names);
    out
}

/// Render a list of sibling annotations separated by `", "`.
#[must_use]
pub fn to_sexpr_list(annotations: &[Annotation], names: &impl RuleNames) -> String {
    let mut out = String::new();
    for (i, annotation) in annotations.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_sexpr(&mut out, annotation, names);
    }
    out
}

fn write_sexpr(out: &mut String, annotation: &Annotation, names: &impl RuleNames) {
    out.push_str(&names.rule_name(annotation.rule()));
    if annotation.is_leaf() {
        return;
    }
    out.push('(');
    for (i, child) in annotation.children().iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_sexpr(out, child, names);
    }
    out.push(')');
}

/// Indented outline printer.
#[derive(Debug, Clone)]
pub struct TreePrinter {
    /// Indentation unit
    pub indent: String,
    /// Append `start..end` to every line
    pub show_spans: bool,
}

impl Default for TreePrinter {
    fn default() -> Self {
        Self {
            indent: "  ".into(),
            show_spans: true,
        }
    }
}

impl TreePrinter {
    /// Render `annotation` one node per line.
    ///
    /// `text_of` maps a leaf's span to the source text it covers; leaves are
    /// printed with that text quoted after their name.
    #[must_use]
    pub fn render<F>(&self, annotation: &Annotation, names: &impl RuleNames, text_of: F) -> String
    where
        F: Fn(Span) -> Option<String>,
    {
        let mut out = String::new();
        self.render_node(&mut out, annotation, names, &text_of, 0);
        out
    }

    fn render_node<F>(
        &self,
        out: &mut String,
        annotation: &Annotation,
        names: &impl RuleNames,
        text_of: &F,
        depth: usize,
    ) where
        F: Fn(Span) -> Option<String>,
    {
        for _ in 0..depth {
            out.push_str(&self.indent);
        }
        out.push_str(&names.rule_name(annotation.rule()));
        if self.show_spans {
            let _ = write!(out, " {}", annotation.span());
        }
        if annotation.is_leaf()
            && let Some(text) = text_of(annotation.span())
        {
            let _ = write!(out, " {text:?}");
        }
        out.push('\n');
        for child in annotation.children() {
            self.render_node(out, child, names, text_of, depth + 1);
        }
    }
}
