//! Compiling scripts and matching with the resulting graphs.

use weave::error::{CompileError, GraphError, PipelineError};
use weave::grammar::RuleGraph;
use weave::pipeline::{Pipeline, PipelineConfig};
use weave::syntax::to_sexpr_list;
use weave::{ParseAbort, Severity};

fn chars(text: &str) -> Vec<char> {
    text.chars().collect()
}

fn pipeline() -> Pipeline {
    Pipeline::new(PipelineConfig::default()).unwrap()
}

fn tokenizer(script: &str) -> RuleGraph<char> {
    pipeline().compile_tokenizer(script).unwrap().graph
}

fn compile_errors(script: &str) -> Vec<CompileError> {
    match pipeline().compile_tokenizer(script) {
        Err(PipelineError::Compile(failure)) => failure.errors,
        other => panic!("expected a compile failure, got {other:?}"),
    }
}

const ARITHMETIC_TOKENS: &str = "
    tokens = *token;
    -r token = ws | n | plus | star;
    -a ws = +' ';
    n = 'n';
    plus = '+';
    star = '*';
";

fn arithmetic(grammar: &str) -> Pipeline {
    Pipeline::from_scripts(ARITHMETIC_TOKENS, grammar).unwrap()
}

fn render(pipeline: &Pipeline, text: &str) -> String {
    let output = pipeline.parse(text).unwrap();
    assert!(output.success, "{text:?}: {:?}", output.diagnostics);
    to_sexpr_list(&output.annotations, pipeline.grammar().unwrap())
}

#[test]
fn test_references_resolve_to_named_rules() {
    let graph = tokenizer("root = foo; foo = .;");
    let result = graph.parse(&chars("z")).unwrap();
    assert!(result.success);
    assert_eq!(result.len, 1);
    assert_eq!(graph.name_of(graph.root().unwrap()), Some("root"));
}

#[test]
fn test_missing_reference_is_reported_by_name() {
    let Err(PipelineError::Compile(failure)) = pipeline().compile_tokenizer("root = foo;") else {
        panic!("expected a compile failure");
    };
    assert_eq!(failure.missing_references(), vec!["foo"]);
}

#[test]
fn test_missing_reference_suggests_a_close_name() {
    let errors = compile_errors("root = expresion; expression = 'x';");
    let message = errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    assert!(message.contains("did you mean 'expression'?"), "{message}");
}

#[test]
fn test_duplicate_rule_names_are_rejected() {
    let errors = compile_errors("a = 'x'; a = 'y';");
    assert!(errors.iter().any(|error| matches!(
        error,
        CompileError::Graph(GraphError::DuplicateName { name }) if name == "a"
    )));
}

#[test]
fn test_every_invalid_rule_is_reported() {
    let errors = compile_errors("a = [0]'x'; b = {'z'..'a'}; c = 'c';");
    let invalid: Vec<&str> = errors
        .iter()
        .filter_map(|error| match error {
            CompileError::InvalidRule { rule, .. } => Some(rule.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(invalid, vec!["a", "b"]);
}

#[test]
fn test_unterminated_comment_is_a_warning() {
    let compilation = pipeline().compile_tokenizer("a = 'x'; (* trailing").unwrap();
    assert!(compilation.diagnostics.iter().any(|diagnostic| {
        diagnostic.severity == Severity::Warning && diagnostic.message == "unterminated block comment"
    }));
}

#[test]
fn test_evaluation_respects_precedence() {
    let pipeline = arithmetic("expr = add / mult / n; add 10 = expr, '+', expr; mult 100 = expr, '*', expr;");
    assert_eq!(render(&pipeline, "n + n * n"), "add(n, mult(n, n))");
    assert_eq!(render(&pipeline, "n * n + n"), "add(mult(n, n), n)");
    assert_eq!(render(&pipeline, "n"), "n");
}

#[test]
fn test_evaluation_ties_pick_the_first_alternative() {
    let pipeline = arithmetic("expr = a / b / n; a 10 = expr, '+', expr; b 10 = expr, '+', expr;");
    assert_eq!(render(&pipeline, "n + n"), "a(n, n)");
}

#[test]
fn test_evaluation_falls_through_when_the_right_operand_fails() {
    let pipeline = arithmetic("expr = inc / add / n; inc 10 = expr, '+', star; add 10 = expr, '+', expr;");
    assert_eq!(render(&pipeline, "n + n"), "add(n, n)");
    assert_eq!(render(&pipeline, "n + *"), "inc(n, star)");
}

#[test]
fn test_evaluation_folds_equal_precedence_to_the_left() {
    let pipeline = arithmetic("expr = add / n; add 10 = expr, '+', expr;");
    assert_eq!(render(&pipeline, "n + n + n"), "add(add(n, n), n)");
}

#[test]
fn test_stop_at_and_stop_after() {
    let input = chars("xxxbar");

    let graph = tokenizer("s = stop_at 'bar';");
    assert_eq!(graph.parse(&input).unwrap().len, 3);

    let graph = tokenizer("s = stop_after 'bar';");
    assert_eq!(graph.parse(&input).unwrap().len, 6);

    let graph = tokenizer("s = find 'bar';");
    assert!(!graph.parse(&chars("xxx")).unwrap().success);
}

#[test]
fn test_recovery_logs_survive_pruning() {
    let graph = tokenizer(
        "
        items = *item;
        -a item = ('x', ';') | bad;
        bad = error 'expected x', ., stop_after ';';
        ",
    );
    let result = graph.parse(&chars("x;y;x;")).unwrap();
    assert!(result.success);
    assert_eq!(result.len, 6);

    let logs = weave::parser::collect_logs(&graph, &result.annotations);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].level, Severity::Error);
    assert_eq!(logs[0].message, "expected x");
    assert_eq!(logs[0].span.start(), 2);
}

#[test]
fn test_fatal_log_aborts() {
    let graph = tokenizer("doc = 'a', fatal 'boom';");
    assert!(matches!(
        graph.parse(&chars("a")),
        Err(ParseAbort::Fatal { message, .. }) if message == "boom"
    ));
}
