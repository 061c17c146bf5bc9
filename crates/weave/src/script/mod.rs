//! # Script Module
//!
//! The declaration language for tokenizers and grammars.
//!
//! A script is a list of rules and includes:
//!
//! ```text
//! include 'common.wv';
//! expr = add / mult / number;
//! -r add 10 = expr, '+', expr;
//! number = +{'0'..'9'};
//! ```
//!
//! The same syntax compiles to a char-level graph ([`CharTerminals`]) or
//! to a grammar over the token kinds of a tokenizer ([`TokenTerminals`]).
//!
//! - [`bootstrap`]: the built-in graphs that parse scripts
//! - [`syntax_kind`]: node kinds of a parsed script
//! - [`terminals`]: per-phase meaning of strings and sets
//! - [`compiler`]: syntax tree to rule graph

pub mod bootstrap;
pub mod compiler;
pub mod syntax_kind;
pub mod terminals;

pub use bootstrap::Bootstrap;
pub use compiler::{Compilation, CompiledUnit, Include, compile};
pub use syntax_kind::{SyntaxKind, SyntaxKindTable};
pub use terminals::{CharTerminals, SetItem, Terminals, TokenTerminals, string_value, unescape};
