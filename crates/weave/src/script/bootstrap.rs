//! # Bootstrap Graphs
//!
//! The script language is itself recognized by a pair of graphs built with
//! the combinator API: a character-level tokenizer and a token-level
//! grammar. Every named grammar rule that survives pruning is one
//! [`SyntaxKind`]; helper rules are pruned with `Root` so they leave no node.
//!
//! Malformed statements fall through to recovery branches that log an
//! error and skip to the next statement boundary, so a single bad rule does
//! not hide the rest of the script.

use crate::error::{GraphError, Severity};
use crate::grammar::{GraphBuilder, Pruning, RuleDef, RuleGraph, RuleId};
use crate::script::syntax_kind::SyntaxKindTable;

const KEYWORDS: [(&str, &str); 10] = [
    ("kw_include", "include"),
    ("kw_if", "if"),
    ("kw_find", "find"),
    ("kw_stop_at", "stop_at"),
    ("kw_stop_after", "stop_after"),
    ("kw_error", "error"),
    ("kw_warning", "warning"),
    ("kw_info", "info"),
    ("kw_debug", "debug"),
    ("kw_fatal", "fatal"),
];

const PUNCTUATION: [(&str, &str); 17] = [
    ("dotdot", ".."),
    ("assign", "="),
    ("semicolon", ";"),
    ("comma", ","),
    ("pipe", "|"),
    ("slash", "/"),
    ("lparen", "("),
    ("rparen", ")"),
    ("lbrace", "{"),
    ("rbrace", "}"),
    ("lbracket", "["),
    ("rbracket", "]"),
    ("star", "*"),
    ("plus", "+"),
    ("question", "?"),
    ("bang", "!"),
    ("dot", "."),
];

/// The script tokenizer and grammar, with the syntax kind table of the
/// grammar.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    tokenizer: RuleGraph<char>,
    grammar: RuleGraph<RuleId>,
    kinds: SyntaxKindTable,
}

impl Bootstrap {
    /// # Errors
    ///
    /// Only fails if the built-in graphs are inconsistent.
    pub fn new() -> Result<Self, GraphError> {
        let tokenizer = build_tokenizer()?;
        let grammar = build_grammar(&tokenizer)?;
        let (kinds, missing) = SyntaxKindTable::build(&grammar);
        if let Some(kind) = missing.first() {
            return Err(GraphError::UnknownName {
                name: kind.rule_name().to_string(),
            });
        }
        log::debug!(
            "script bootstrap ready: {} tokenizer rules, {} grammar rules",
            tokenizer.len(),
            grammar.len()
        );
        Ok(Self {
            tokenizer,
            grammar,
            kinds,
        })
    }

    #[must_use]
    pub const fn tokenizer(&self) -> &RuleGraph<char> {
        &self.tokenizer
    }

    #[must_use]
    pub const fn grammar(&self) -> &RuleGraph<RuleId> {
        &self.grammar
    }

    #[must_use]
    pub const fn kinds(&self) -> &SyntaxKindTable {
        &self.kinds
    }
}

fn build_tokenizer() -> Result<RuleGraph<char>, GraphError> {
    let mut b = GraphBuilder::<char>::new();

    let space = b.add(RuleDef::set([' ', '\t', '\r', '\n']));
    let whitespace = b.define("whitespace", RuleDef::count(space, 1, 0).pruning(Pruning::All));

    let hash = b.add(RuleDef::single('#'));
    let newline = b.add(RuleDef::single('\n'));
    let to_line_end = b.add(RuleDef::skip(newline, true, false));
    let line_comment = b.define(
        "line_comment",
        RuleDef::sequence([hash, to_line_end]).pruning(Pruning::All),
    );

    let open = b.add(RuleDef::text("(*"));
    let close = b.add(RuleDef::text("*)"));
    let through_close = b.add(RuleDef::skip(close, false, true));
    let unterminated = b.add(RuleDef::log(Severity::Warning, "unterminated block comment"));
    let rest = b.add(RuleDef::any_between(0, 0));
    let unterminated_tail = b.add(RuleDef::sequence([unterminated, rest]));
    let comment_body = b.add(RuleDef::one_of([through_close, unterminated_tail]));
    let block_comment = b.define(
        "block_comment",
        RuleDef::sequence([open, comment_body]).pruning(Pruning::All),
    );

    let any = b.add(RuleDef::any());
    let backslash = b.add(RuleDef::single('\\'));
    let escape = b.add(RuleDef::sequence([backslash, any]));
    let mut quoted = Vec::new();
    for quote in ['"', '\''] {
        let delimiter = b.add(RuleDef::single(quote));
        let stop = b.add(RuleDef::set([quote, '\\', '\n']));
        let not_stop = b.add(RuleDef::not(stop));
        let plain = b.add(RuleDef::sequence([not_stop, any]));
        let piece = b.add(RuleDef::one_of([escape, plain]));
        let body = b.add(RuleDef::count(piece, 0, 0));
        quoted.push(b.add(RuleDef::sequence([delimiter, body, delimiter])));
    }
    let string = b.define("string", RuleDef::one_of(quoted).pruning(Pruning::Children));

    let lower = b.add(RuleDef::range('a', 'z'));
    let upper = b.add(RuleDef::range('A', 'Z'));
    let underscore = b.add(RuleDef::single('_'));
    let digit = b.add(RuleDef::range('0', '9'));
    let ident_start = b.add(RuleDef::one_of([lower, upper, underscore]));
    let ident_char = b.add(RuleDef::one_of([lower, upper, underscore, digit]));
    let word_end = b.add(RuleDef::not(ident_char));

    let integer = b.define("integer", RuleDef::count(digit, 1, 0).pruning(Pruning::Children));

    let minus = b.add(RuleDef::single('-'));
    let prune_letter = b.add(RuleDef::set(['a', 'r', 'c']));
    let prune = b.define(
        "prune",
        RuleDef::sequence([minus, prune_letter, word_end]).pruning(Pruning::Children),
    );

    let mut alternatives = vec![whitespace, line_comment, block_comment, string, integer, prune];
    for (name, text) in KEYWORDS {
        let literal = b.add(RuleDef::text(text));
        alternatives.push(b.define(
            name,
            RuleDef::sequence([literal, word_end]).pruning(Pruning::Children),
        ));
    }

    let ident_tail = b.add(RuleDef::count(ident_char, 0, 0));
    alternatives.push(b.define(
        "ident",
        RuleDef::sequence([ident_start, ident_tail]).pruning(Pruning::Children),
    ));

    for (name, text) in PUNCTUATION {
        alternatives.push(b.define(name, RuleDef::text(text)));
    }
    alternatives.push(b.define("invalid", RuleDef::any()));

    let token = b.add(RuleDef::one_of(alternatives).pruning(Pruning::Root));
    let tokens = b.define("tokens", RuleDef::count(token, 0, 0));
    b.set_root(tokens);
    b.finish()
}

/// Grammar construction helpers over a token-level builder.
struct Grammar<'t> {
    b: GraphBuilder<RuleId>,
    tokenizer: &'t RuleGraph<char>,
}

impl Grammar<'_> {
    fn token(&self, name: &str) -> Result<RuleId, GraphError> {
        self.tokenizer.id_of(name).ok_or_else(|| GraphError::UnknownName {
            name: name.to_string(),
        })
    }

    /// The imported, named token rule; its annotations are kept.
    fn kept(&self, name: &str) -> Result<RuleId, GraphError> {
        self.b.graph().id_of(name).ok_or_else(|| GraphError::UnknownName {
            name: name.to_string(),
        })
    }

    /// An anonymous match of the token that leaves no annotation.
    fn hidden(&mut self, name: &str) -> Result<RuleId, GraphError> {
        let token = self.token(name)?;
        Ok(self.b.add(RuleDef::single(token).pruning(Pruning::All)))
    }

    fn seq(&mut self, subs: impl IntoIterator<Item = RuleId>) -> RuleId {
        self.b.add(RuleDef::sequence(subs).pruning(Pruning::Root))
    }

    /// Sequence whose annotations are dropped except for log annotations.
    fn quiet(&mut self, subs: impl IntoIterator<Item = RuleId>) -> RuleId {
        self.b.add(RuleDef::sequence(subs).pruning(Pruning::All))
    }

    fn choice(&mut self, subs: impl IntoIterator<Item = RuleId>) -> RuleId {
        self.b.add(RuleDef::one_of(subs).pruning(Pruning::Root))
    }

    fn opt(&mut self, sub: RuleId) -> RuleId {
        self.b.add(RuleDef::optional(sub).pruning(Pruning::Root))
    }

    fn many(&mut self, sub: RuleId, min: usize) -> RuleId {
        self.b.add(RuleDef::count(sub, min, 0).pruning(Pruning::Root))
    }

    fn error(&mut self, message: &str) -> RuleId {
        self.b.add(RuleDef::log(Severity::Error, message))
    }
}

fn build_grammar(tokenizer: &RuleGraph<char>) -> Result<RuleGraph<RuleId>, GraphError> {
    let mut g = Grammar {
        b: GraphBuilder::new(),
        tokenizer,
    };
    for (name, id) in tokenizer.named() {
        g.b.define(name, RuleDef::single(id));
    }

    let ident = g.kept("ident")?;
    let string = g.kept("string")?;
    let integer = g.kept("integer")?;
    let prune = g.kept("prune")?;
    let dot = g.kept("dot")?;
    let dotdot = g.kept("dotdot")?;
    let star = g.kept("star")?;
    let plus = g.kept("plus")?;
    let question = g.kept("question")?;
    let kw_find = g.kept("kw_find")?;
    let kw_stop_at = g.kept("kw_stop_at")?;
    let kw_stop_after = g.kept("kw_stop_after")?;
    let kw_error = g.kept("kw_error")?;
    let kw_warning = g.kept("kw_warning")?;
    let kw_info = g.kept("kw_info")?;
    let kw_debug = g.kept("kw_debug")?;
    let kw_fatal = g.kept("kw_fatal")?;

    let assign = g.hidden("assign")?;
    let semicolon = g.hidden("semicolon")?;
    let comma = g.hidden("comma")?;
    let pipe = g.hidden("pipe")?;
    let slash = g.hidden("slash")?;
    let lparen = g.hidden("lparen")?;
    let rparen = g.hidden("rparen")?;
    let lbrace = g.hidden("lbrace")?;
    let rbrace = g.hidden("rbrace")?;
    let lbracket = g.hidden("lbracket")?;
    let rbracket = g.hidden("rbracket")?;
    let bang = g.hidden("bang")?;
    let kw_if = g.hidden("kw_if")?;
    let kw_include = g.hidden("kw_include")?;
    let hidden_dotdot = g.hidden("dotdot")?;
    let hidden_prune = g.hidden("prune")?;

    let unary_ref = g.b.reference("unary");
    let body_ref = g.b.reference("body");

    // Header: [prune] ident [integer]
    let opt_prune = g.opt(prune);
    let opt_integer = g.opt(integer);
    let header = g.b.define("header", RuleDef::sequence([opt_prune, ident, opt_integer]));

    // Counted repetition: '*' | '+' | '?' | '[' n ['..' [m]] ']'
    let upper = g.opt(integer);
    let range_tail = g.seq([dotdot, upper]);
    let opt_range_tail = g.opt(range_tail);
    let bounds = g.b.define(
        "bounds",
        RuleDef::sequence([lbracket, integer, opt_range_tail, rbracket]),
    );
    let count_op = g.choice([star, plus, question, bounds]);
    let count = g.b.define("count", RuleDef::sequence([count_op, unary_ref]));

    let not = g.b.define("not", RuleDef::sequence([bang, unary_ref]));
    let condition = g.b.define("condition", RuleDef::sequence([kw_if, unary_ref]));

    let skip_kind = g.choice([kw_find, kw_stop_at, kw_stop_after]);
    let skip = g.b.define("skip", RuleDef::sequence([skip_kind, unary_ref]));

    let level = g.choice([kw_error, kw_warning, kw_info, kw_debug, kw_fatal]);
    let log_condition = g.seq([kw_if, unary_ref]);
    let opt_log_condition = g.opt(log_condition);
    let log = g.b.define("log", RuleDef::sequence([level, string, opt_log_condition]));

    let item_range = g.seq([hidden_dotdot, string]);
    let opt_item_range = g.opt(item_range);
    let set_item = g.b.define("set_item", RuleDef::sequence([string, opt_item_range]));
    let items = g.many(set_item, 0);
    let set = g.b.define("set", RuleDef::sequence([lbrace, items, rbrace]));

    let group = g.b.define("group", RuleDef::sequence([lparen, body_ref, rparen]));
    let primary = g.choice([string, set, dot, ident, group]);
    let unary_body = g.choice([count, not, condition, skip, log, primary]);

    // A pruning prefix followed by another prefix or an operator is dropped
    // with a warning.
    let follow = g.choice([prune, pipe, slash, comma, semicolon, rparen]);
    let misplaced = g.seq([prune, follow]);
    let peek = g.b.add(RuleDef::condition(misplaced).pruning(Pruning::All));
    let warn = g.b.add(RuleDef::log_if(Severity::Warning, "unexpected pruning prefix", misplaced));
    let bad_prefix = g.seq([peek, warn, hidden_prune]);
    let bad_prefixes = g.many(bad_prefix, 0);
    let opt_unary_prune = g.opt(prune);
    g.b.define("unary", RuleDef::sequence([bad_prefixes, opt_unary_prune, unary_body]));

    let unary = g.kept("unary")?;
    let comma_unary = g.seq([comma, unary]);
    let sequence_tail = g.choice([comma_unary, bad_prefix]);
    let more_unary = g.many(sequence_tail, 0);
    let sequence = g.b.define("sequence", RuleDef::sequence([unary, more_unary]));

    // Body: a sequence, optionally continued by '|' alternatives or '/'
    // operands. The continuation is its own node so the leading sequence is
    // matched once.
    let pipe_sequence = g.seq([pipe, sequence]);
    let choice = g.b.define("choice", RuleDef::count(pipe_sequence, 1, 0));
    let slash_sequence = g.seq([slash, sequence]);
    let evaluation = g.b.define("evaluation", RuleDef::count(slash_sequence, 1, 0));
    let body_tail = g.choice([choice, evaluation]);
    let opt_body_tail = g.opt(body_tail);
    let body = g.b.define(
        "body",
        RuleDef::sequence([sequence, opt_body_tail]).pruning(Pruning::Root),
    );

    let include = g.b.define("include", RuleDef::sequence([kw_include, string, semicolon]));
    let rule = g.b.define("rule", RuleDef::sequence([header, assign, body, semicolon]));

    // Recovery branches, tried in order after the well-formed statements.
    let skip_statement = g.b.add(RuleDef::skip(semicolon, false, false).pruning(Pruning::All));
    let any = g.b.add(RuleDef::any());
    let end_of_input = g.b.add(RuleDef::not(any));
    let opt_next_prune = g.opt(prune);
    let opt_next_integer = g.opt(integer);
    let next_rule = g.seq([opt_next_prune, ident, opt_next_integer, assign]);
    let boundary = g.choice([next_rule, kw_include, end_of_input]);
    let at_boundary = g.b.add(RuleDef::condition(boundary).pruning(Pruning::All));

    let missing_terminator_log = g.error("missing ';' after rule body");
    let missing_terminator = g.quiet([header, assign, body, at_boundary, missing_terminator_log]);

    let bad_operator_log = g.error("expected ';' or an operator after rule body");
    let bad_operator = g.quiet([header, assign, body, bad_operator_log, skip_statement]);

    let no_assign = g.b.add(RuleDef::not(assign));
    let missing_assignment_log = g.error("expected '=' after rule header");
    let missing_assignment = g.quiet([header, no_assign, missing_assignment_log, skip_statement]);

    let missing_body_log = g.error("expected a rule body");
    let missing_body = g.quiet([header, assign, missing_body_log, skip_statement]);

    let unexpected_log = g.error("unexpected input");
    let any_then_skip = g.seq([any, skip_statement]);
    let discard = g.choice([semicolon, any_then_skip]);
    let unexpected = g.quiet([unexpected_log, discard]);

    let statement = g.b.define(
        "statement",
        RuleDef::one_of([
            include,
            rule,
            missing_terminator,
            bad_operator,
            missing_assignment,
            missing_body,
            unexpected,
        ])
        .pruning(Pruning::Root),
    );
    let script = g.b.define("script", RuleDef::count(statement, 0, 0));
    g.b.set_root(script);
    g.b.finish()
}
