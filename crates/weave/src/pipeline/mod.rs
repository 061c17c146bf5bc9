//! # Pipeline
//!
//! Tokenizer script, grammar script and target text in one place.
//!
//! A [`Pipeline`] owns the script bootstrap, a tokenizer graph and a grammar
//! graph. Scripts are compiled with their includes merged in; target text is
//! tokenized, parsed, and every log annotation of both phases is returned
//! as a [`Diagnostic`].
//!
//! ```rust
//! use weave::pipeline::Pipeline;
//!
//! let pipeline = Pipeline::from_scripts(
//!     "tokens = *token; -r token = ws | num | plus; -a ws = +' '; -c num = +{'0'..'9'}; plus = '+';",
//!     "sum = num, *('+', num);",
//! )?;
//! let output = pipeline.parse("1 + 2 + 3")?;
//! assert!(output.success);
//! assert_eq!(output.tokens.tokens.len(), 5);
//! # Ok::<(), weave::error::PipelineError>(())
//! ```

pub mod include;

pub use include::{FsLoader, LoadedSource, MemoryLoader, SourceLoader};

use crate::error::{
    CompileFailure, Diagnostic, DiagnosticList, Location, ParseAbort, PipelineError, Severity,
};
use crate::grammar::{Element, RuleGraph, RuleId};
use crate::parser::{Matcher, ParseConfig, Tokenized, collect_logs, tokenize};
use crate::script::{Bootstrap, CharTerminals, Compilation, CompiledUnit, Terminals, TokenTerminals, compile};
use crate::syntax::{Annotation, LineIndex, Span};
use include::{CacheState, IncludeCache};
use std::path::PathBuf;

const TOKENIZER_UNIT: &str = "<tokenizer>";
const GRAMMAR_UNIT: &str = "<grammar>";

/// Pipeline settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    /// Directories searched for relative include paths, in order
    pub search_paths: Vec<PathBuf>,
    /// Treat warnings in parsed text as failures
    pub fail_on_warning: bool,
    pub parse: ParseConfig,
}

/// Result of [`Pipeline::parse`].
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub tokens: Tokenized,
    /// Grammar annotations, spans in tokens
    pub annotations: Vec<Annotation>,
    /// Diagnostics of both phases, spans in chars, ordered by position
    pub diagnostics: Vec<Diagnostic>,
    /// All text was consumed and no error was reported
    pub success: bool,
}

impl ParseOutput {
    /// Char span of a grammar annotation span.
    #[must_use]
    pub fn char_span(&self, span: Span, text_len: usize) -> Span {
        self.tokens.char_span(span, text_len)
    }
}

/// Re-express a grammar-phase abort, positioned in tokens, in characters.
fn abort_in_chars(abort: ParseAbort, tokens: &Tokenized, text_len: usize) -> ParseAbort {
    match abort {
        ParseAbort::Fatal { message, span } => ParseAbort::Fatal {
            message,
            span: tokens.char_span(span, text_len),
        },
        ParseAbort::DepthExceeded { limit, position } => ParseAbort::DepthExceeded {
            limit,
            position: tokens.char_span(Span::empty(position), text_len).start(),
        },
        other => other,
    }
}

/// Compiles scripts and runs the resulting tokenizer and grammar.
///
/// `L` resolves include paths; [`FsLoader`] unless replaced with
/// [`with_loader`](Self::with_loader).
#[derive(Debug)]
pub struct Pipeline<L = FsLoader> {
    config: PipelineConfig,
    loader: L,
    bootstrap: Bootstrap,
    tokenizer: Option<RuleGraph<char>>,
    grammar: Option<RuleGraph<RuleId>>,
}

impl Pipeline<FsLoader> {
    /// # Errors
    ///
    /// Fails only if the script bootstrap cannot be built.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let bootstrap = Bootstrap::new()
            .map_err(|error| CompileFailure::new("bootstrap", vec![error.into()]))?;
        Ok(Self {
            config,
            loader: FsLoader,
            bootstrap,
            tokenizer: None,
            grammar: None,
        })
    }

    /// A pipeline with default settings and both scripts loaded.
    ///
    /// # Errors
    ///
    /// Any compile error of either script.
    pub fn from_scripts(tokenizer: &str, grammar: &str) -> Result<Self, PipelineError> {
        let mut pipeline = Self::new(PipelineConfig::default())?;
        pipeline.load_tokenizer(tokenizer)?;
        pipeline.load_grammar(grammar)?;
        Ok(pipeline)
    }
}

impl<L: SourceLoader> Pipeline<L> {
    /// Replace the include loader.
    #[must_use]
    pub fn with_loader<M: SourceLoader>(self, loader: M) -> Pipeline<M> {
        Pipeline {
            config: self.config,
            loader,
            bootstrap: self.bootstrap,
            tokenizer: self.tokenizer,
            grammar: self.grammar,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub const fn bootstrap(&self) -> &Bootstrap {
        &self.bootstrap
    }

    #[must_use]
    pub const fn tokenizer(&self) -> Option<&RuleGraph<char>> {
        self.tokenizer.as_ref()
    }

    #[must_use]
    pub const fn grammar(&self) -> Option<&RuleGraph<RuleId>> {
        self.grammar.as_ref()
    }

    /// Compile a tokenizer script.
    ///
    /// # Errors
    ///
    /// Compile errors of the script or any include, and include lookup
    /// failures.
    pub fn compile_tokenizer(&self, script: &str) -> Result<Compilation<char>, PipelineError> {
        self.compile_unit(&CharTerminals, TOKENIZER_UNIT, script)
    }

    /// Load a tokenizer script through the loader and compile it.
    ///
    /// # Errors
    ///
    /// See [`compile_tokenizer`](Self::compile_tokenizer).
    pub fn compile_tokenizer_file(&self, path: &str) -> Result<Compilation<char>, PipelineError> {
        let source = self.loader.load(path, &self.config.search_paths)?;
        self.compile_unit(&CharTerminals, &source.key, &source.text)
    }

    /// Compile a grammar script over the token kinds of `tokenizer`.
    ///
    /// # Errors
    ///
    /// See [`compile_tokenizer`](Self::compile_tokenizer).
    pub fn compile_grammar(
        &self,
        script: &str,
        tokenizer: &RuleGraph<char>,
    ) -> Result<Compilation<RuleId>, PipelineError> {
        self.compile_unit(&TokenTerminals::new(tokenizer), GRAMMAR_UNIT, script)
    }

    /// Load a grammar script through the loader and compile it.
    ///
    /// # Errors
    ///
    /// See [`compile_tokenizer`](Self::compile_tokenizer).
    pub fn compile_grammar_file(
        &self,
        path: &str,
        tokenizer: &RuleGraph<char>,
    ) -> Result<Compilation<RuleId>, PipelineError> {
        let source = self.loader.load(path, &self.config.search_paths)?;
        self.compile_unit(&TokenTerminals::new(tokenizer), &source.key, &source.text)
    }

    /// Compile and keep a tokenizer script. A previously loaded grammar is
    /// dropped, its token kinds no longer being valid.
    ///
    /// # Errors
    ///
    /// See [`compile_tokenizer`](Self::compile_tokenizer).
    pub fn load_tokenizer(&mut self, script: &str) -> Result<Vec<Diagnostic>, PipelineError> {
        let Compilation { graph, diagnostics } = self.compile_tokenizer(script)?;
        self.install_tokenizer(graph);
        Ok(diagnostics)
    }

    /// Compile and keep a grammar script over the loaded tokenizer.
    ///
    /// # Errors
    ///
    /// [`PipelineError::NotLoaded`] without a tokenizer, otherwise see
    /// [`compile_tokenizer`](Self::compile_tokenizer).
    pub fn load_grammar(&mut self, script: &str) -> Result<Vec<Diagnostic>, PipelineError> {
        let tokenizer = self.loaded_tokenizer()?;
        let Compilation { graph, diagnostics } = self.compile_grammar(script, tokenizer)?;
        self.grammar = Some(graph);
        Ok(diagnostics)
    }

    /// [`load_tokenizer`](Self::load_tokenizer) from a file.
    ///
    /// # Errors
    ///
    /// See [`compile_tokenizer_file`](Self::compile_tokenizer_file).
    pub fn load_tokenizer_file(&mut self, path: &str) -> Result<Vec<Diagnostic>, PipelineError> {
        let Compilation { graph, diagnostics } = self.compile_tokenizer_file(path)?;
        self.install_tokenizer(graph);
        Ok(diagnostics)
    }

    /// [`load_grammar`](Self::load_grammar) from a file.
    ///
    /// # Errors
    ///
    /// See [`load_grammar`](Self::load_grammar).
    pub fn load_grammar_file(&mut self, path: &str) -> Result<Vec<Diagnostic>, PipelineError> {
        let tokenizer = self.loaded_tokenizer()?;
        let Compilation { graph, diagnostics } = self.compile_grammar_file(path, tokenizer)?;
        self.grammar = Some(graph);
        Ok(diagnostics)
    }

    fn install_tokenizer(&mut self, graph: RuleGraph<char>) {
        self.tokenizer = Some(graph);
        if self.grammar.take().is_some() {
            log::debug!("tokenizer replaced, grammar dropped");
        }
    }

    fn loaded_tokenizer(&self) -> Result<&RuleGraph<char>, PipelineError> {
        self.tokenizer
            .as_ref()
            .ok_or(PipelineError::NotLoaded { phase: "tokenizer" })
    }

    /// Tokenize `text` with the loaded tokenizer.
    ///
    /// # Errors
    ///
    /// [`PipelineError::NotLoaded`] without a tokenizer, or an abort.
    pub fn tokenize(&self, text: &str) -> Result<Tokenized, PipelineError> {
        let chars: Vec<char> = text.chars().collect();
        Ok(tokenize(self.loaded_tokenizer()?, &chars, self.config.parse)?)
    }

    /// Tokenize and parse `text`.
    ///
    /// Malformed text is not an error: it shows up as diagnostics and a
    /// cleared [`ParseOutput::success`].
    ///
    /// # Errors
    ///
    /// [`PipelineError::NotLoaded`] when a graph is missing, an abort from
    /// either phase, and [`PipelineError::Rejected`] when
    /// [`PipelineConfig::fail_on_warning`] is set and anything at warning
    /// level or above was reported. Abort positions are in characters for
    /// both phases.
    pub fn parse(&self, text: &str) -> Result<ParseOutput, PipelineError> {
        let tokenizer = self.loaded_tokenizer()?;
        let grammar = self
            .grammar
            .as_ref()
            .ok_or(PipelineError::NotLoaded { phase: "grammar" })?;

        let chars: Vec<char> = text.chars().collect();
        let index = LineIndex::new(text);
        let tokens = tokenize(tokenizer, &chars, self.config.parse)?;

        let mut diagnostics: Vec<Diagnostic> = tokens
            .logs
            .iter()
            .map(|log| Diagnostic::new(log.level, log.message.as_str(), Location::new(log.span, &index)))
            .collect();
        if let Some(c) = chars.get(tokens.len) {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                format!("unexpected character {c:?}"),
                Location::new(Span::new(tokens.len, 1), &index),
            ));
        }

        let kinds = tokens.kinds();
        let root = grammar.root().ok_or(ParseAbort::MissingRoot)?;
        let mut matcher = Matcher::new(grammar, &kinds, self.config.parse);
        let result = matcher
            .parse(root, 0)
            .map_err(|abort| abort_in_chars(abort, &tokens, chars.len()))?;
        let farthest = matcher.farthest();

        for log in collect_logs(grammar, &result.annotations) {
            let span = tokens.char_span(log.span, chars.len());
            diagnostics.push(Diagnostic::new(log.level, log.message.as_str(), Location::new(span, &index)));
        }

        let complete = result.success && result.len == kinds.len();
        if !complete {
            let at = if result.success { farthest.max(result.len) } else { farthest };
            let message = match tokens.tokens.get(at) {
                Some(token) => format!(
                    "unexpected {} {:?}",
                    tokenizer.display_name(token.kind),
                    token.text(&chars)
                ),
                None => "unexpected end of input".to_string(),
            };
            let span = tokens.char_span(Span::new(at, 1), chars.len());
            diagnostics.push(Diagnostic::new(Severity::Error, message, Location::new(span, &index)));
        }

        diagnostics.sort_by_key(|diagnostic| diagnostic.location.span.start());
        if self.config.fail_on_warning && diagnostics.any_at_least(Severity::Warning) {
            return Err(PipelineError::Rejected { diagnostics });
        }

        let success = complete && tokens.len == chars.len() && !diagnostics.any_at_least(Severity::Error);
        log::debug!(
            "parsed {} chars into {} tokens: success={success}, {} diagnostics",
            chars.len(),
            kinds.len(),
            diagnostics.len()
        );
        Ok(ParseOutput {
            tokens,
            annotations: result.annotations,
            diagnostics,
            success,
        })
    }

    /// Compile one top-level unit with its includes, then resolve strictly.
    fn compile_unit<T, P>(&self, terminals: &P, unit: &str, source: &str) -> Result<Compilation<T>, PipelineError>
    where
        T: Element,
        P: Terminals<T>,
    {
        let mut cache = IncludeCache::new();
        let mut diagnostics = Vec::new();
        cache.begin(unit);
        let graph = self.compile_with_includes(terminals, unit, source, &mut cache, &mut diagnostics, false)?;

        let unit_output = CompiledUnit {
            graph,
            includes: Vec::new(),
            diagnostics,
        };
        Ok(unit_output.finish(unit)?)
    }

    /// Compile `source` and merge its includes depth-first. The unit's own
    /// rules are registered first, so they win name collisions.
    fn compile_with_includes<T, P>(
        &self,
        terminals: &P,
        unit: &str,
        source: &str,
        cache: &mut IncludeCache<T>,
        diagnostics: &mut Vec<Diagnostic>,
        nested: bool,
    ) -> Result<RuleGraph<T>, PipelineError>
    where
        T: Element,
        P: Terminals<T>,
    {
        let compiled = compile(&self.bootstrap, terminals, unit, source, self.config.parse)?;
        diagnostics.extend(compiled.diagnostics.into_iter().map(|mut diagnostic| {
            if nested {
                diagnostic.message = format!("{unit}: {}", diagnostic.message);
            }
            diagnostic
        }));

        let mut graph = compiled.graph;
        for include in compiled.includes {
            let loaded = self.loader.load(&include.path, &self.config.search_paths)?;
            match cache.state(&loaded.key) {
                CacheState::Compiled(included) => {
                    graph.merge(included);
                }
                CacheState::InProgress => {
                    log::warn!("circular include of '{}' from {unit}", include.path);
                    diagnostics.push(Diagnostic::new(
                        Severity::Warning,
                        format!("circular include of '{}' skipped", include.path),
                        include.location,
                    ));
                }
                CacheState::Unseen => {
                    cache.begin(loaded.key.clone());
                    let included =
                        self.compile_with_includes(terminals, &loaded.key, &loaded.text, cache, diagnostics, true)?;
                    let report = graph.merge(&included);
                    log::debug!(
                        "included {} into {unit}: {} rules added, {} shadowed",
                        loaded.key,
                        report.added,
                        report.shadowed.len()
                    );
                    cache.complete(loaded.key, included);
                }
            }
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKENIZER: &str = "
        tokens = *token;
        -r token = ws | num | ident | plus | semi;
        -a ws = +{' ' '\\n'};
        -c num = +{'0'..'9'};
        -c ident = +{'a'..'z'};
        plus = '+';
        semi = ';';
    ";

    fn pipeline(grammar: &str) -> Pipeline {
        Pipeline::from_scripts(TOKENIZER, grammar).unwrap()
    }

    #[test]
    fn test_parse_reports_unexpected_token() {
        let pipeline = pipeline("sum = num, *('+', num);");
        let output = pipeline.parse("1 + 2 +").unwrap();
        assert!(!output.success);
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].message, "unexpected end of input");
        assert_eq!(output.diagnostics[0].location.column, 8);

        let output = pipeline.parse("1 + + 2").unwrap();
        assert!(!output.success);
        assert_eq!(output.diagnostics[0].message, "unexpected plus \"+\"");
        assert_eq!(output.diagnostics[0].location.column, 5);
    }

    #[test]
    fn test_parse_reports_unexpected_character() {
        let pipeline = pipeline("sum = num, *('+', num);");
        let output = pipeline.parse("1 + 2 ?").unwrap();
        assert!(!output.success);
        assert_eq!(output.diagnostics[0].message, "unexpected character '?'");
    }

    #[test]
    fn test_grammar_logs_become_diagnostics() {
        let pipeline = pipeline(
            "stmts = *stmt; stmt = num, semi | bad; -r bad = error 'expected a number', ., stop_after semi;",
        );
        let output = pipeline.parse("1; x; 2;").unwrap();
        assert!(!output.success);
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].message, "expected a number");
        assert_eq!(output.diagnostics[0].location.column, 4);
        assert_eq!(output.tokens.tokens.len(), 6);
    }

    #[test]
    fn test_grammar_abort_is_positioned_in_characters() {
        let pipeline = pipeline("sum = num, *(plus, num), fatal 'dangling operator' if plus;");
        assert!(pipeline.parse("12  + 3").unwrap().success);
        assert!(matches!(
            pipeline.parse("12  + 3 +"),
            Err(PipelineError::Aborted(ParseAbort::Fatal { message, span }))
                if message == "dangling operator" && span == Span::new(8, 1)
        ));

        let pipeline = self::pipeline("doc = semi, fatal 'stop';");
        assert!(matches!(
            pipeline.parse("  ;  x"),
            Err(PipelineError::Aborted(ParseAbort::Fatal { span, .. })) if span == Span::empty(5)
        ));
    }

    #[test]
    fn test_fail_on_warning() {
        let mut pipeline = Pipeline::new(PipelineConfig {
            fail_on_warning: true,
            ..PipelineConfig::default()
        })
        .unwrap();
        pipeline.load_tokenizer(TOKENIZER).unwrap();
        pipeline
            .load_grammar("doc = num, warning 'trailing' if ident, *.;")
            .unwrap();

        assert!(pipeline.parse("1").unwrap().success);
        assert!(matches!(
            pipeline.parse("1 x"),
            Err(PipelineError::Rejected { diagnostics }) if diagnostics.len() == 1
        ));
    }

    #[test]
    fn test_not_loaded() {
        let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        assert!(matches!(
            pipeline.parse("x"),
            Err(PipelineError::NotLoaded { phase: "tokenizer" })
        ));
        assert!(matches!(
            pipeline.load_grammar("a = 'x';"),
            Err(PipelineError::NotLoaded { .. })
        ));
        pipeline.load_tokenizer(TOKENIZER).unwrap();
        assert!(matches!(
            pipeline.parse("x"),
            Err(PipelineError::NotLoaded { phase: "grammar" })
        ));
        assert_eq!(pipeline.tokenize("ab 12").unwrap().tokens.len(), 2);
    }

    #[test]
    fn test_includes_merge_with_local_rules_first() {
        let loader = MemoryLoader::new()
            .with("digits.wv", "num = 'overridden'; digit = {'0'..'9'};")
            .with("more.wv", "include 'digits.wv'; extra = digit;");
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap().with_loader(loader);
        let compiled = pipeline
            .compile_tokenizer("include 'more.wv'; include 'digits.wv'; num = +digit;")
            .unwrap();

        let graph = compiled.graph;
        assert_eq!(graph.name_of(graph.root().unwrap()), Some("num"));
        assert!(graph.id_of("extra").is_some());
        let input: Vec<char> = "123".chars().collect();
        assert_eq!(graph.parse(&input).unwrap().len, 3);
        assert!(compiled.diagnostics.is_empty());
    }

    #[test]
    fn test_missing_include_propagates() {
        let pipeline = Pipeline::new(PipelineConfig::default())
            .unwrap()
            .with_loader(MemoryLoader::new());
        assert!(matches!(
            pipeline.compile_tokenizer("include 'nowhere.wv'; a = 'a';"),
            Err(PipelineError::IncludeNotFound { path, .. }) if path == "nowhere.wv"
        ));
    }
}
