//! CLI interface for weave-tools

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "weave")]
#[command(about = "Compile weave tokenizer and grammar scripts and run them over text")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that compiles scripts.
#[derive(Args, Debug, Clone, Default)]
pub struct CompileArgs {
    /// Tokenizer script
    #[arg(short, long)]
    pub tokenizer: PathBuf,

    /// Directory searched for included scripts (repeatable)
    #[arg(short = 'I', long = "include")]
    pub include: Vec<PathBuf>,

    /// Maximum rule nesting depth while matching
    #[arg(long, default_value_t = 512)]
    pub max_depth: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Tokenize a file and print one token per line
    Tokens {
        #[command(flatten)]
        compile: CompileArgs,

        /// Text to tokenize
        input: PathBuf,
    },

    /// Parse a file and print its syntax tree and diagnostics
    Parse {
        #[command(flatten)]
        compile: CompileArgs,

        /// Grammar script over the tokenizer's tokens
        #[arg(short, long)]
        grammar: PathBuf,

        /// Treat warnings as failures
        #[arg(long)]
        fail_on_warning: bool,

        /// Output format
        #[arg(short, long, default_value = "tree")]
        format: OutputFormat,

        /// Text to parse
        input: PathBuf,
    },

    /// Compile scripts and report graph metrics
    Check {
        #[command(flatten)]
        compile: CompileArgs,

        /// Grammar script over the tokenizer's tokens
        #[arg(short, long)]
        grammar: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "tree")]
        format: OutputFormat,
    },

    /// Print the rule graph of a script in Graphviz format
    Graph {
        #[command(flatten)]
        compile: CompileArgs,

        /// Render this grammar instead of the tokenizer
        #[arg(short, long)]
        grammar: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Tree,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tree" | "text" => Ok(Self::Tree),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}. Supported: tree, json")),
        }
    }
}
