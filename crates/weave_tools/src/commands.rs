//! Command implementations. Each returns the text to print and whether the
//! run succeeded.

use crate::cli::{CompileArgs, OutputFormat};
use crate::render;
use std::error::Error;
use std::fs;
use std::path::Path;
use weave::parser::ParseConfig;
use weave::pipeline::{Pipeline, PipelineConfig};
use weave::{Diagnostic, PipelineError};

pub type CommandResult = Result<Outcome, Box<dyn Error>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub output: String,
    pub success: bool,
}

impl Outcome {
    fn ok(output: String) -> Self {
        Self { output, success: true }
    }
}

fn new_pipeline(args: &CompileArgs, fail_on_warning: bool) -> Result<Pipeline, PipelineError> {
    Pipeline::new(PipelineConfig {
        search_paths: args.include.clone(),
        fail_on_warning,
        parse: ParseConfig {
            max_depth: args.max_depth,
        },
    })
}

fn path_str(path: &Path) -> Result<&str, Box<dyn Error>> {
    path.to_str()
        .ok_or_else(|| format!("path {} is not valid UTF-8", path.display()).into())
}

/// Compile diagnostics are warnings and below; print them to stderr.
fn report_compile(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{diagnostic}");
    }
}

fn load(args: &CompileArgs, grammar: Option<&Path>, fail_on_warning: bool) -> Result<Pipeline, Box<dyn Error>> {
    let mut pipeline = new_pipeline(args, fail_on_warning)?;
    report_compile(&pipeline.load_tokenizer_file(path_str(&args.tokenizer)?)?);
    if let Some(grammar) = grammar {
        report_compile(&pipeline.load_grammar_file(path_str(grammar)?)?);
    }
    Ok(pipeline)
}

/// `weave tokens`
///
/// # Errors
///
/// Script compile failures, unreadable input, or an aborted match.
pub fn tokens(args: &CompileArgs, input: &Path) -> CommandResult {
    let pipeline = load(args, None, false)?;
    let text = fs::read_to_string(input)?;
    let tokens = pipeline.tokenize(&text)?;
    let tokenizer = pipeline
        .tokenizer()
        .ok_or(PipelineError::NotLoaded { phase: "tokenizer" })?;

    let mut output = render::render_tokens(&tokens, tokenizer, &text);
    let consumed = tokens.len == text.chars().count();
    if !consumed {
        output.push_str(&format!("stopped at character {}\n", tokens.len));
    }
    Ok(Outcome {
        output,
        success: consumed,
    })
}

/// `weave parse`
///
/// # Errors
///
/// Script compile failures, unreadable input, an aborted match, or
/// rejected diagnostics with `--fail-on-warning`.
pub fn parse(
    args: &CompileArgs,
    grammar: &Path,
    fail_on_warning: bool,
    format: OutputFormat,
    input: &Path,
) -> CommandResult {
    let pipeline = load(args, Some(grammar), fail_on_warning)?;
    let text = fs::read_to_string(input)?;
    let parsed = pipeline.parse(&text)?;
    let grammar = pipeline
        .grammar()
        .ok_or(PipelineError::NotLoaded { phase: "grammar" })?;

    let output = match format {
        OutputFormat::Tree => {
            let mut output = render::render_tree(&parsed, grammar, &text);
            output.push_str(&render::render_diagnostics(&parsed.diagnostics));
            output
        }
        OutputFormat::Json => format!("{:#}\n", render::parse_json(&parsed, grammar)),
    };
    Ok(Outcome {
        output,
        success: parsed.success,
    })
}

/// `weave check`
///
/// # Errors
///
/// Script compile failures.
pub fn check(args: &CompileArgs, grammar: Option<&Path>, format: OutputFormat) -> CommandResult {
    let pipeline = load(args, grammar, false)?;
    let mut graphs = Vec::new();
    if let Some(tokenizer) = pipeline.tokenizer() {
        graphs.push(("tokenizer", tokenizer.metrics(), render::metrics_json("tokenizer", tokenizer)));
    }
    if let Some(grammar) = pipeline.grammar() {
        graphs.push(("grammar", grammar.metrics(), render::metrics_json("grammar", grammar)));
    }

    let output = match format {
        OutputFormat::Tree => graphs
            .iter()
            .map(|(phase, metrics, _)| format!("{phase}: {}\n", metrics.summary()))
            .collect(),
        OutputFormat::Json => {
            let values: Vec<_> = graphs.into_iter().map(|(_, _, json)| json).collect();
            format!("{:#}\n", serde_json::Value::Array(values))
        }
    };
    Ok(Outcome::ok(output))
}

/// `weave graph`
///
/// # Errors
///
/// Script compile failures.
pub fn graph(args: &CompileArgs, grammar: Option<&Path>) -> CommandResult {
    let pipeline = load(args, grammar, false)?;
    let dot = match (pipeline.grammar(), pipeline.tokenizer()) {
        (Some(grammar), _) => render::generate_dot(grammar),
        (None, Some(tokenizer)) => render::generate_dot(tokenizer),
        (None, None) => return Err(PipelineError::NotLoaded { phase: "tokenizer" }.into()),
    };
    Ok(Outcome::ok(dot))
}
