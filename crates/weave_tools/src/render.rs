//! Text, JSON and Graphviz renderings of tokens, parse trees and rule graphs.

use std::fmt::Write;
use weave::grammar::{Element, RuleGraph, RuleId, RuleKind};
use weave::parser::Tokenized;
use weave::syntax::{LineIndex, Span, TreePrinter};
use weave::{Diagnostic, ParseOutput};

/// One line per token: `line:column kind "text"`.
#[must_use]
pub fn render_tokens(tokens: &Tokenized, tokenizer: &RuleGraph<char>, text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let index = LineIndex::new(text);
    let mut out = String::new();
    for token in &tokens.tokens {
        let at = index.span_start(token.span);
        let _ = writeln!(
            out,
            "{}:{} {} {:?}",
            at.line + 1,
            at.column + 1,
            tokenizer.display_name(token.kind),
            token.text(&chars)
        );
    }
    out
}

/// Indented syntax tree; leaves show the text of the tokens they cover.
#[must_use]
pub fn render_tree(output: &ParseOutput, grammar: &RuleGraph<RuleId>, text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let printer = TreePrinter {
        show_spans: false,
        ..TreePrinter::default()
    };
    let text_of = |span: Span| -> Option<String> {
        let span = output.char_span(span, chars.len());
        chars.get(span.start()..span.end()).map(|covered| covered.iter().collect())
    };
    output
        .annotations
        .iter()
        .map(|annotation| printer.render(annotation, grammar, text_of))
        .collect()
}

#[must_use]
pub fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics.iter().map(|diagnostic| format!("{diagnostic}\n")).collect()
}

/// Parse result as JSON: success flag, diagnostics and the tree in
/// s-expression form.
#[must_use]
pub fn parse_json(output: &ParseOutput, grammar: &RuleGraph<RuleId>) -> serde_json::Value {
    serde_json::json!({
        "success": output.success,
        "tokens": output.tokens.tokens.len(),
        "tree": weave::syntax::to_sexpr_list(&output.annotations, grammar),
        "diagnostics": output.diagnostics,
    })
}

/// Metrics of one compiled graph as JSON.
#[must_use]
pub fn metrics_json<T: Element>(phase: &str, graph: &RuleGraph<T>) -> serde_json::Value {
    let metrics = graph.metrics();
    serde_json::json!({
        "phase": phase,
        "rules": metrics.rule_count,
        "named": metrics.named_count,
        "reachable": metrics.reachable_count,
        "references": metrics.reference_count,
        "unresolved": metrics.unresolved_count,
        "nullable": metrics.nullable_count,
        "logs": metrics.log_count,
        "max_alternatives": metrics.max_alternatives,
    })
}

/// Graphviz rendering of the named rules of `graph` and the named rules
/// each one uses, looking through anonymous rules in between.
#[must_use]
pub fn generate_dot<T: Element>(graph: &RuleGraph<T>) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "digraph Rules {{");
    let _ = writeln!(output, "  rankdir=LR;");
    let _ = writeln!(output, "  node [shape=ellipse];");
    let _ = writeln!(output);

    let root = graph.root();
    for (name, id) in graph.named() {
        let shape = match graph.rule(id).map(|rule| rule.kind()) {
            Some(RuleKind::Log { .. }) => ", shape=note",
            Some(kind) if kind.sub_rules().is_empty() => ", shape=box, style=filled, fillcolor=lightblue",
            _ => "",
        };
        let root_style = if root == Some(id) { ", penwidth=2" } else { "" };
        let _ = writeln!(output, "  \"{name}\" [label=\"{name}\"{shape}{root_style}];");
    }

    let _ = writeln!(output);
    for (name, id) in graph.named() {
        for target in named_uses(graph, id) {
            let _ = writeln!(output, "  \"{name}\" -> \"{}\";", graph.display_name(target));
        }
    }

    let _ = writeln!(output, "}}");
    output
}

/// Named rules reachable from `from` without passing through another
/// named rule, in first-seen order.
fn named_uses<T: Element>(graph: &RuleGraph<T>, from: RuleId) -> Vec<RuleId> {
    let mut seen = vec![false; graph.len()];
    let mut found = Vec::new();
    let mut stack: Vec<RuleId> = graph
        .rule(from)
        .map(|rule| rule.kind().sub_rules().into_iter().rev().collect())
        .unwrap_or_default();

    while let Some(id) = stack.pop() {
        let Some(rule) = graph.rule(id) else {
            continue;
        };
        if std::mem::replace(&mut seen[id.index()], true) {
            continue;
        }
        if rule.name().is_some() {
            found.push(id);
        } else {
            stack.extend(rule.kind().sub_rules().into_iter().rev());
        }
    }
    found
}
