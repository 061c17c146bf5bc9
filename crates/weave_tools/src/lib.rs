//! Weave Tools - command-line utilities for weave scripts
//!
//! This crate provides the `weave` binary: tokenizing and parsing files with
//! compiled scripts, reporting graph metrics, and rendering rule graphs.

pub mod cli;
pub mod commands;
pub mod render;

pub use commands::{CommandResult, Outcome};
pub use render::{generate_dot, render_tokens, render_tree};
