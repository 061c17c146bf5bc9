//! Weave Tools CLI
//!
//! Command-line tools for working with weave tokenizers and grammars.

use clap::Parser;
use std::fs;
use std::process::ExitCode;
use weave_tools::cli::{Cli, Commands};
use weave_tools::commands;

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let outcome = match &cli.command {
        Commands::Tokens { compile, input } => commands::tokens(compile, input)?,
        Commands::Parse {
            compile,
            grammar,
            fail_on_warning,
            format,
            input,
        } => commands::parse(compile, grammar, *fail_on_warning, *format, input)?,
        Commands::Check {
            compile,
            grammar,
            format,
        } => commands::check(compile, grammar.as_deref(), *format)?,
        Commands::Graph {
            compile,
            grammar,
            output,
        } => {
            let outcome = commands::graph(compile, grammar.as_deref())?;
            if let Some(path) = output {
                fs::write(path, &outcome.output)?;
                log::info!("wrote rule graph to {}", path.display());
                return Ok(ExitCode::SUCCESS);
            }
            outcome
        }
    };

    print!("{}", outcome.output);
    Ok(if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
