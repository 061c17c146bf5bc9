//! Phase-specific meaning of script terminals.
//!
//! The same script syntax compiles to a `RuleGraph<char>` (a tokenizer) or a
//! `RuleGraph<RuleId>` (a grammar over a tokenizer's token kinds). Only
//! string literals and sets differ between the two, and the grammar phase
//! also starts from a graph that already contains one rule per token.

use crate::grammar::{Element, RuleDef, RuleGraph, RuleId, RuleKind};
use smallvec::SmallVec;

/// Largest number of chars a set range may expand to.
pub const MAX_RANGE_EXPANSION: u32 = 65_536;

/// One entry of a `{ ... }` set, already unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetItem {
    Text(String),
    Range(String, String),
}

/// How terminals of a script become rules over elements `T`.
pub trait Terminals<T: Element> {
    /// Graph the compiled rules are added to.
    fn prelude(&self) -> RuleGraph<T>;

    /// Rule for a string literal.
    ///
    /// # Errors
    ///
    /// A message describing why the literal has no meaning in this phase.
    fn literal(&self, text: &str) -> Result<RuleKind<T>, String>;

    /// Rule for a set.
    ///
    /// # Errors
    ///
    /// A message describing the first item that cannot be expressed.
    fn set(&self, items: &[SetItem]) -> Result<RuleKind<T>, String>;
}

/// Terminals of a tokenizer script: strings are runs of chars.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharTerminals;

impl Terminals<char> for CharTerminals {
    fn prelude(&self) -> RuleGraph<char> {
        RuleGraph::new()
    }

    fn literal(&self, text: &str) -> Result<RuleKind<char>, String> {
        if text.is_empty() {
            return Err("empty string literal".to_string());
        }
        Ok(RuleKind::Literal(text.chars().collect()))
    }

    fn set(&self, items: &[SetItem]) -> Result<RuleKind<char>, String> {
        if let [SetItem::Range(lo, hi)] = items {
            let (lo, hi) = range_bounds(lo, hi)?;
            return Ok(RuleKind::Range { lo, hi });
        }

        let mut chars = Vec::new();
        for item in items {
            match item {
                SetItem::Text(text) => chars.extend(text.chars()),
                SetItem::Range(lo, hi) => {
                    let (lo, hi) = range_bounds(lo, hi)?;
                    let width = u32::from(hi) - u32::from(lo) + 1;
                    if width > MAX_RANGE_EXPANSION {
                        return Err(format!(
                            "range '{lo}'..'{hi}' covers {width} chars, more than {MAX_RANGE_EXPANSION}"
                        ));
                    }
                    chars.extend(lo..=hi);
                }
            }
        }
        Ok(RuleDef::set(chars).kind)
    }
}

fn single_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

fn range_bounds(lo: &str, hi: &str) -> Result<(char, char), String> {
    let (Some(lo_char), Some(hi_char)) = (single_char(lo), single_char(hi)) else {
        return Err(format!("range bounds '{lo}'..'{hi}' must be single chars"));
    };
    if lo_char > hi_char {
        return Err(format!("empty range '{lo}'..'{hi}'"));
    }
    Ok((lo_char, hi_char))
}

/// Terminals of a grammar script: a string names the token whose rule
/// matches exactly that text.
#[derive(Debug, Clone, Copy)]
pub struct TokenTerminals<'t> {
    tokenizer: &'t RuleGraph<char>,
}

impl<'t> TokenTerminals<'t> {
    #[must_use]
    pub const fn new(tokenizer: &'t RuleGraph<char>) -> Self {
        Self { tokenizer }
    }

    /// First named tokenizer rule that matches exactly `text` and nothing else.
    #[must_use]
    pub fn token_for(&self, text: &str) -> Option<RuleId> {
        let wanted: SmallVec<[char; 8]> = text.chars().collect();
        self.tokenizer.iter().find_map(|rule| {
            rule.name()?;
            let exact = match rule.kind() {
                RuleKind::Literal(chars) => *chars == wanted,
                RuleKind::Single(c) => wanted.as_slice() == [*c],
                _ => false,
            };
            exact.then(|| rule.id())
        })
    }

    fn token(&self, text: &str) -> Result<RuleId, String> {
        self.token_for(text)
            .ok_or_else(|| format!("no token rule matches '{text}'"))
    }
}

impl Terminals<RuleId> for TokenTerminals<'_> {
    /// One rule per named token, under the token's name, matching that
    /// token kind.
    fn prelude(&self) -> RuleGraph<RuleId> {
        let mut graph = RuleGraph::new();
        for (name, id) in self.tokenizer.named() {
            if let Err(error) = graph.register(RuleDef::single(id).named(name)) {
                log::warn!("token '{name}' not imported: {error}");
            }
        }
        graph
    }

    fn literal(&self, text: &str) -> Result<RuleKind<RuleId>, String> {
        self.token(text).map(RuleKind::Single)
    }

    fn set(&self, items: &[SetItem]) -> Result<RuleKind<RuleId>, String> {
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            match item {
                SetItem::Text(text) => ids.push(self.token(text)?),
                SetItem::Range(lo, hi) => {
                    return Err(format!("range '{lo}'..'{hi}' has no meaning over tokens"));
                }
            }
        }
        Ok(RuleDef::set(ids).kind)
    }
}

/// Resolve backslash escapes in the body of a quoted string.
///
/// # Errors
///
/// Unknown escapes and a trailing lone backslash.
pub fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next() {
            Some('\\') => '\\',
            Some('\'') => '\'',
            Some('"') => '"',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('0') => '\0',
            Some(other) => return Err(format!("unknown escape '\\{other}'")),
            None => return Err("string ends with a lone backslash".to_string()),
        };
        out.push(escaped);
    }
    Ok(out)
}

/// Strip the quotes from a string token and resolve its escapes.
///
/// # Errors
///
/// See [`unescape`]; also fails if `token` is not quoted.
pub fn string_value(token: &str) -> Result<String, String> {
    let quote = token.chars().next().filter(|q| *q == '"' || *q == '\'');
    match quote {
        Some(q) if token.len() >= 2 && token.ends_with(q) => unescape(&token[1..token.len() - 1]),
        _ => Err(format!("malformed string token {token}")),
    }
}
