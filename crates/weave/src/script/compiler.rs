//! # Script Compiler
//!
//! Turns the syntax tree of one script into rules of a [`RuleGraph`].
//!
//! The script is tokenized and parsed with the [`Bootstrap`] graphs, log
//! annotations from both phases become [`Diagnostic`]s, and every remaining
//! node is dispatched on its [`SyntaxKind`]. Inline sub-expressions become
//! anonymous rules; each `name = body;` statement becomes one named rule.
//!
//! References are left unresolved: a unit may still have includes merged
//! into it. [`CompiledUnit::finish`] resolves and validates a unit that is
//! complete.

use crate::error::{CompileError, CompileFailure, Diagnostic, Location, Severity};
use crate::grammar::{Element, Pruning, RuleDef, RuleGraph, RuleId, RuleKind};
use crate::parser::{LogEntry, ParseConfig, Tokenized, collect_logs, tokenize};
use crate::script::bootstrap::Bootstrap;
use crate::script::syntax_kind::SyntaxKind;
use crate::script::terminals::{SetItem, Terminals, string_value};
use crate::syntax::{Annotation, LineIndex, Span};
use compact_str::CompactString;

/// An `include` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    pub path: String,
    pub location: Location,
}

/// Output of compiling one script, before includes are merged.
#[derive(Debug, Clone)]
pub struct CompiledUnit<T> {
    pub graph: RuleGraph<T>,
    pub includes: Vec<Include>,
    /// Warnings and lesser diagnostics; errors fail the compile instead
    pub diagnostics: Vec<Diagnostic>,
}

/// A compiled, resolved and validated graph.
#[derive(Debug, Clone)]
pub struct Compilation<T> {
    pub graph: RuleGraph<T>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T: Element> CompiledUnit<T> {
    /// Resolve references strictly and validate.
    ///
    /// # Errors
    ///
    /// Missing references and validation errors, aggregated under `unit`.
    pub fn finish(self, unit: &str) -> Result<Compilation<T>, CompileFailure> {
        let Self {
            mut graph,
            diagnostics,
            ..
        } = self;

        let mut errors = Vec::new();
        if let Err(error) = graph.resolve_references() {
            errors.push(error.into());
        }
        if let Err(error) = graph.validate() {
            errors.push(error.into());
        }
        if !errors.is_empty() {
            return Err(CompileFailure::new(unit, errors));
        }
        Ok(Compilation { graph, diagnostics })
    }
}

/// Compile `source` into rules over `T`, starting from `terminals`' prelude.
///
/// # Errors
///
/// Every error found in the script, aggregated under `unit`.
pub fn compile<T, P>(
    bootstrap: &Bootstrap,
    terminals: &P,
    unit: &str,
    source: &str,
    config: ParseConfig,
) -> Result<CompiledUnit<T>, CompileFailure>
where
    T: Element,
    P: Terminals<T>,
{
    let chars: Vec<char> = source.chars().collect();
    let tokens = tokenize(bootstrap.tokenizer(), &chars, config)
        .map_err(|abort| CompileFailure::new(unit, vec![abort.into()]))?;

    let mut compiler = Compiler {
        bootstrap,
        terminals,
        index: LineIndex::new(source),
        chars,
        tokens,
        graph: terminals.prelude(),
        rule: CompactString::default(),
        root: None,
        includes: Vec::new(),
        diagnostics: Vec::new(),
        errors: Vec::new(),
    };
    compiler.run(config);

    let Compiler {
        graph,
        includes,
        diagnostics,
        errors,
        ..
    } = compiler;
    log::debug!(
        "compiled {unit}: {} rules, {} includes, {} diagnostics, {} errors",
        graph.len(),
        includes.len(),
        diagnostics.len(),
        errors.len()
    );

    if errors.is_empty() {
        Ok(CompiledUnit {
            graph,
            includes,
            diagnostics,
        })
    } else {
        Err(CompileFailure::new(unit, errors))
    }
}

type Parts<'n> = Vec<(SyntaxKind, &'n Annotation)>;

struct Compiler<'a, T, P> {
    bootstrap: &'a Bootstrap,
    terminals: &'a P,
    chars: Vec<char>,
    index: LineIndex,
    tokens: Tokenized,
    graph: RuleGraph<T>,
    /// Name of the rule being compiled
    rule: CompactString,
    root: Option<RuleId>,
    includes: Vec<Include>,
    diagnostics: Vec<Diagnostic>,
    errors: Vec<CompileError>,
}

impl<T: Element, P: Terminals<T>> Compiler<'_, T, P> {
    fn run(&mut self, config: ParseConfig) {
        let tokenizer_logs = std::mem::take(&mut self.tokens.logs);
        for log in &tokenizer_logs {
            self.report(log, log.span);
        }
        if self.tokens.len < self.chars.len() {
            let at = Span::empty(self.tokens.len);
            self.diagnose(Severity::Error, "unexpected character", at);
        }

        let kinds = self.tokens.kinds();
        let result = match self.bootstrap.grammar().parse_with(&kinds, config) {
            Ok(result) => result,
            Err(abort) => {
                self.errors.push(abort.into());
                return;
            }
        };

        for log in collect_logs(self.bootstrap.grammar(), &result.annotations) {
            let span = self.tokens.char_span(log.span, self.chars.len());
            self.report(&log, span);
        }
        if !result.success || result.len < kinds.len() {
            let at = if result.success { result.len } else { 0 };
            let span = self.tokens.char_span(Span::empty(at), self.chars.len());
            self.diagnose(Severity::Error, "could not parse script", span);
        }

        for node in &result.annotations {
            match self.kind(node) {
                Ok(SyntaxKind::Script) => {
                    for statement in node.children() {
                        self.statement(statement);
                    }
                }
                _ => self.statement(node),
            }
        }

        if let Some(root) = self.root
            && let Err(error) = self.graph.set_root(root)
        {
            self.errors.push(error.into());
        }
    }

    fn report(&mut self, log: &LogEntry, span: Span) {
        self.diagnose(log.level, log.message.as_str(), span);
    }

    fn diagnose(&mut self, severity: Severity, message: &str, span: Span) {
        let diagnostic = Diagnostic::new(severity, message, Location::new(span, &self.index));
        log::debug!("script diagnostic {diagnostic}");
        if diagnostic.is_error() {
            self.errors.push(CompileError::Script(diagnostic));
        } else {
            self.diagnostics.push(diagnostic);
        }
    }

    fn statement(&mut self, node: &Annotation) {
        if self.bootstrap.grammar().is_log(node.rule()) {
            return;
        }
        let outcome = match self.kind(node) {
            Ok(SyntaxKind::Rule) => self.rule(node),
            Ok(SyntaxKind::Include) => self.include(node),
            Ok(kind) => Err(malformed(kind, "expected a rule or an include")),
            Err(error) => Err(error),
        };
        if let Err(error) = outcome {
            self.errors.push(error);
        }
    }

    fn include(&mut self, node: &Annotation) -> Result<(), CompileError> {
        let parts = self.parts(node)?;
        let [(SyntaxKind::String, path)] = parts.as_slice() else {
            return Err(malformed(SyntaxKind::Include, "expected a path string"));
        };
        let path = self.string(path)?;
        self.includes.push(Include {
            path,
            location: self.location(node),
        });
        Ok(())
    }

    fn rule(&mut self, node: &Annotation) -> Result<(), CompileError> {
        let parts = self.parts(node)?;
        let [(SyntaxKind::Header, header), body @ ..] = parts.as_slice() else {
            return Err(malformed(SyntaxKind::Rule, "expected a header"));
        };
        let (outer, name, precedence) = self.header(header)?;
        self.rule = name.clone();

        let (def, inner) = self.body(body)?;
        let def = match (outer, inner) {
            (Some(outer), Some(inner)) => {
                // The body keeps its own pruning; the header's applies to
                // what survives of it.
                let body = self.register(def.pruning(inner))?;
                RuleDef::new(RuleKind::Reference {
                    target: CompactString::from(self.graph.display_name(body)),
                    subject: Some(body),
                })
                .pruning(outer)
            }
            (outer, inner) => def.pruning(outer.or(inner).unwrap_or_default()),
        };

        let id = self.register(def.named(name).precedence(precedence))?;
        if self.root.is_none() {
            self.root = Some(id);
        }
        Ok(())
    }

    fn header(&self, node: &Annotation) -> Result<(Option<Pruning>, CompactString, i32), CompileError> {
        let mut pruning = None;
        let mut name = None;
        let mut precedence = 0;
        for (kind, part) in self.parts(node)? {
            match kind {
                SyntaxKind::Prune => pruning = Some(self.pruning(part)?),
                SyntaxKind::Ident => name = Some(CompactString::from(self.text(part))),
                SyntaxKind::Integer => {
                    let text = self.text(part);
                    precedence = text.parse().map_err(|_| CompileError::InvalidRule {
                        rule: name.as_deref().unwrap_or_default().to_string(),
                        message: format!("precedence '{text}' is out of range"),
                        location: self.location(part),
                    })?;
                }
                other => return Err(malformed(SyntaxKind::Header, format!("unexpected '{other}'"))),
            }
        }
        let name = name.ok_or_else(|| malformed(SyntaxKind::Header, "missing rule name"))?;
        Ok((pruning, name, precedence))
    }

    /// The rule a syntax node stands for, and the pruning prefix written on
    /// it, if any.
    fn element(&mut self, node: &Annotation) -> Result<(RuleDef<T>, Option<Pruning>), CompileError> {
        let kind = self.kind(node)?;
        let parts = self.parts(node)?;

        let def = match kind {
            SyntaxKind::Group => return self.body(&parts),
            SyntaxKind::Sequence => match parts.as_slice() {
                [(_, only)] => return self.element(only),
                _ => RuleDef::sequence(self.inline_all(&parts)?),
            },
            SyntaxKind::Unary => return self.unary(&parts),
            SyntaxKind::Count => self.count(&parts)?,
            SyntaxKind::Not => RuleDef::not(self.inline_single(kind, &parts)?),
            SyntaxKind::Condition => RuleDef::condition(self.inline_single(kind, &parts)?),
            SyntaxKind::Skip => self.skip(&parts)?,
            SyntaxKind::Log => self.log(&parts)?,
            SyntaxKind::Set => self.set(node, &parts)?,
            SyntaxKind::String => {
                let text = self.string(node)?;
                let terminal = self
                    .terminals
                    .literal(&text)
                    .map_err(|message| self.invalid(node, message))?;
                RuleDef::new(terminal)
            }
            SyntaxKind::Dot => RuleDef::any(),
            SyntaxKind::Ident => RuleDef::reference(self.text(node)),
            SyntaxKind::Script
            | SyntaxKind::Choice
            | SyntaxKind::Evaluation
            | SyntaxKind::Include
            | SyntaxKind::Rule
            | SyntaxKind::Header
            | SyntaxKind::Bounds
            | SyntaxKind::SetItem
            | SyntaxKind::Integer
            | SyntaxKind::Prune
            | SyntaxKind::DotDot
            | SyntaxKind::Star
            | SyntaxKind::Plus
            | SyntaxKind::Question
            | SyntaxKind::KwFind
            | SyntaxKind::KwStopAt
            | SyntaxKind::KwStopAfter
            | SyntaxKind::KwError
            | SyntaxKind::KwWarning
            | SyntaxKind::KwInfo
            | SyntaxKind::KwDebug
            | SyntaxKind::KwFatal => return Err(malformed(kind, "not a rule expression")),
        };
        Ok((def, None))
    }

    /// A rule body: a sequence, possibly continued by a choice or an
    /// evaluation node holding the remaining alternatives.
    fn body(&mut self, parts: &[(SyntaxKind, &Annotation)]) -> Result<(RuleDef<T>, Option<Pruning>), CompileError> {
        match parts {
            [(SyntaxKind::Sequence, only)] => self.element(only),
            [
                (SyntaxKind::Sequence, first),
                (tail_kind @ (SyntaxKind::Choice | SyntaxKind::Evaluation), tail),
            ] => {
                let mut alternatives = vec![self.inline(first)?];
                for (_, alternative) in self.parts(tail)? {
                    alternatives.push(self.inline(alternative)?);
                }
                let def = match tail_kind {
                    SyntaxKind::Choice => RuleDef::one_of(alternatives),
                    _ => RuleDef::evaluation(alternatives),
                };
                Ok((def, None))
            }
            _ => Err(malformed(SyntaxKind::Rule, "expected a rule body")),
        }
    }

    /// Register `node` as an anonymous rule.
    fn inline(&mut self, node: &Annotation) -> Result<RuleId, CompileError> {
        let (def, prefix) = self.element(node)?;
        let pruning = prefix.unwrap_or_else(|| inline_pruning(&def.kind));
        self.register(def.pruning(pruning))
    }

    fn inline_all(&mut self, parts: &Parts<'_>) -> Result<Vec<RuleId>, CompileError> {
        parts.iter().map(|(_, part)| self.inline(part)).collect()
    }

    fn inline_single(&mut self, kind: SyntaxKind, parts: &Parts<'_>) -> Result<RuleId, CompileError> {
        match parts.as_slice() {
            [(_, operand)] => self.inline(operand),
            _ => Err(malformed(kind, "expected one operand")),
        }
    }

    fn unary(&mut self, parts: &Parts<'_>) -> Result<(RuleDef<T>, Option<Pruning>), CompileError> {
        match parts.as_slice() {
            [(SyntaxKind::Prune, prune), (_, operand)] => {
                let prefix = self.pruning(prune)?;
                let (def, inner) = self.element(operand)?;
                Ok((def, Some(prefix).or(inner)))
            }
            [(_, operand)] => self.element(operand),
            _ => Err(malformed(SyntaxKind::Unary, "expected one operand")),
        }
    }

    fn count(&mut self, parts: &Parts<'_>) -> Result<RuleDef<T>, CompileError> {
        let [(op_kind, op), (_, operand)] = parts.as_slice() else {
            return Err(malformed(SyntaxKind::Count, "expected an operator and an operand"));
        };
        let (min, max) = match op_kind {
            SyntaxKind::Star => (0, 0),
            SyntaxKind::Plus => (1, 0),
            SyntaxKind::Question => (0, 1),
            SyntaxKind::Bounds => self.bounds(op)?,
            other => return Err(malformed(SyntaxKind::Count, format!("unexpected '{other}'"))),
        };
        let sub = self.inline(operand)?;
        Ok(RuleDef::count(sub, min, max))
    }

    fn bounds(&self, node: &Annotation) -> Result<(usize, usize), CompileError> {
        let parts = self.parts(node)?;
        match parts.as_slice() {
            [(SyntaxKind::Integer, exact)] => {
                let exact = self.integer(exact)?;
                if exact == 0 {
                    return Err(self.invalid(node, "repetition count [0] never matches anything"));
                }
                Ok((exact, exact))
            }
            [(SyntaxKind::Integer, min), (SyntaxKind::DotDot, _)] => Ok((self.integer(min)?, 0)),
            [(SyntaxKind::Integer, min), (SyntaxKind::DotDot, _), (SyntaxKind::Integer, max)] => {
                let (min, max) = (self.integer(min)?, self.integer(max)?);
                if max == 0 {
                    return Err(self.invalid(node, "repetition upper bound must be positive"));
                }
                if max < min {
                    return Err(self.invalid(node, format!("repetition bounds [{min}..{max}] are reversed")));
                }
                Ok((min, max))
            }
            _ => Err(malformed(SyntaxKind::Bounds, "expected 'n', 'n..' or 'n..m'")),
        }
    }

    fn skip(&mut self, parts: &Parts<'_>) -> Result<RuleDef<T>, CompileError> {
        let [(keyword, _), (_, operand)] = parts.as_slice() else {
            return Err(malformed(SyntaxKind::Skip, "expected a keyword and an operand"));
        };
        let (stop_before, fail_on_eof) = match keyword {
            SyntaxKind::KwFind => (true, true),
            SyntaxKind::KwStopAt => (true, false),
            SyntaxKind::KwStopAfter => (false, false),
            other => return Err(malformed(SyntaxKind::Skip, format!("unexpected '{other}'"))),
        };
        let stop = self.inline(operand)?;
        Ok(RuleDef::skip(stop, stop_before, fail_on_eof))
    }

    fn log(&mut self, parts: &Parts<'_>) -> Result<RuleDef<T>, CompileError> {
        let (keyword, message, condition) = match parts.as_slice() {
            [(keyword, _), (SyntaxKind::String, message)] => (*keyword, *message, None),
            [(keyword, _), (SyntaxKind::String, message), (_, condition)] => {
                (*keyword, *message, Some(*condition))
            }
            _ => return Err(malformed(SyntaxKind::Log, "expected a level and a message")),
        };
        let level = match keyword {
            SyntaxKind::KwError => Severity::Error,
            SyntaxKind::KwWarning => Severity::Warning,
            SyntaxKind::KwInfo => Severity::Info,
            SyntaxKind::KwDebug => Severity::Debug,
            SyntaxKind::KwFatal => Severity::Fatal,
            other => return Err(malformed(SyntaxKind::Log, format!("unexpected '{other}'"))),
        };
        let message = self.string(message)?;
        Ok(match condition {
            Some(condition) => RuleDef::log_if(level, message, self.inline(condition)?),
            None => RuleDef::log(level, message),
        })
    }

    fn set(&self, node: &Annotation, parts: &Parts<'_>) -> Result<RuleDef<T>, CompileError> {
        let mut items = Vec::with_capacity(parts.len());
        for (_, item) in parts {
            let bounds = self.parts(item)?;
            items.push(match bounds.as_slice() {
                [(SyntaxKind::String, text)] => SetItem::Text(self.string(text)?),
                [(SyntaxKind::String, lo), (SyntaxKind::String, hi)] => {
                    SetItem::Range(self.string(lo)?, self.string(hi)?)
                }
                _ => return Err(malformed(SyntaxKind::SetItem, "expected a string or a range")),
            });
        }
        let terminal = self
            .terminals
            .set(&items)
            .map_err(|message| self.invalid(node, message))?;
        Ok(RuleDef::new(terminal))
    }

    fn register(&mut self, def: RuleDef<T>) -> Result<RuleId, CompileError> {
        Ok(self.graph.register(def)?)
    }

    fn kind(&self, node: &Annotation) -> Result<SyntaxKind, CompileError> {
        self.bootstrap
            .kinds()
            .get(node.rule())
            .ok_or_else(|| CompileError::UnmappedSyntaxKind {
                kind: self.bootstrap.grammar().display_name(node.rule()).into_owned(),
                rule: node.rule(),
            })
    }

    /// Children of `node` with their kinds, log annotations excluded.
    fn parts<'n>(&self, node: &'n Annotation) -> Result<Parts<'n>, CompileError> {
        let grammar = self.bootstrap.grammar();
        node.children()
            .iter()
            .filter(|child| !grammar.is_log(child.rule()))
            .map(|child| self.kind(child).map(|kind| (kind, child)))
            .collect()
    }

    fn char_span(&self, node: &Annotation) -> Span {
        self.tokens.char_span(node.span(), self.chars.len())
    }

    fn text(&self, node: &Annotation) -> String {
        let span = self.char_span(node);
        self.chars
            .get(span.start()..span.end())
            .map(|chars| chars.iter().collect())
            .unwrap_or_default()
    }

    fn location(&self, node: &Annotation) -> Location {
        Location::new(self.char_span(node), &self.index)
    }

    fn string(&self, node: &Annotation) -> Result<String, CompileError> {
        string_value(&self.text(node)).map_err(|message| self.invalid(node, message))
    }

    fn integer(&self, node: &Annotation) -> Result<usize, CompileError> {
        let text = self.text(node);
        text.parse()
            .map_err(|_| self.invalid(node, format!("integer '{text}' is out of range")))
    }

    fn pruning(&self, node: &Annotation) -> Result<Pruning, CompileError> {
        let text = self.text(node);
        Pruning::from_prefix(&text)
            .ok_or_else(|| malformed(SyntaxKind::Prune, format!("unknown prefix '{text}'")))
    }

    fn invalid(&self, node: &Annotation, message: impl Into<String>) -> CompileError {
        CompileError::InvalidRule {
            rule: self.rule.to_string(),
            message: message.into(),
            location: self.location(node),
        }
    }
}

fn malformed(kind: SyntaxKind, message: impl Into<String>) -> CompileError {
    CompileError::MalformedNode {
        kind: kind.to_string(),
        message: message.into(),
    }
}

/// Pruning of an anonymous rule written without a prefix.
fn inline_pruning<T: Element>(kind: &RuleKind<T>) -> Pruning {
    match kind {
        RuleKind::Sequence(_) | RuleKind::OneOf(_) | RuleKind::Count { .. } | RuleKind::Skip { .. } => {
            Pruning::Root
        }
        kind if kind.is_terminal() => Pruning::All,
        _ => Pruning::None,
    }
}
