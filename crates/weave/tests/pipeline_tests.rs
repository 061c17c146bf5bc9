//! Includes and two-phase parsing through the pipeline.

use std::fs;
use weave::error::{PipelineError, Severity};
use weave::pipeline::{MemoryLoader, Pipeline, PipelineConfig};
use weave::syntax::to_sexpr_list;

fn chars(text: &str) -> Vec<char> {
    text.chars().collect()
}

fn memory_pipeline(loader: MemoryLoader) -> Pipeline<MemoryLoader> {
    Pipeline::new(PipelineConfig::default()).unwrap().with_loader(loader)
}

#[test]
fn test_include_cycle_is_skipped_with_a_warning() {
    let loader = MemoryLoader::new()
        .with("a.wv", "include 'b.wv'; a = 'a' | b;")
        .with("b.wv", "include 'a.wv'; b = 'b';");
    let compilation = memory_pipeline(loader).compile_tokenizer_file("a.wv").unwrap();

    assert!(compilation.diagnostics.iter().any(|diagnostic| {
        diagnostic.severity == Severity::Warning && diagnostic.message.contains("circular include of 'a.wv'")
    }));
    let graph = compilation.graph;
    assert!(graph.id_of("a").is_some());
    assert!(graph.id_of("b").is_some());
    assert_eq!(graph.name_of(graph.root().unwrap()), Some("a"));
    assert!(graph.parse(&chars("b")).unwrap().success);
}

#[test]
fn test_shared_include_is_compiled_once() {
    let loader = MemoryLoader::new()
        .with("main.wv", "include 'left.wv'; include 'right.wv'; main = left | right;")
        .with("left.wv", "include 'digit.wv'; left = 'l', digit;")
        .with("right.wv", "include 'digit.wv'; right = 'r', digit;")
        .with("digit.wv", "digit = {'0'..'9'};");
    let compilation = memory_pipeline(loader).compile_tokenizer_file("main.wv").unwrap();

    assert!(compilation.diagnostics.is_empty(), "{:?}", compilation.diagnostics);
    let graph = compilation.graph;
    assert_eq!(graph.named().filter(|(name, _)| *name == "digit").count(), 1);
    assert!(graph.parse(&chars("r7")).unwrap().success);
}

#[test]
fn test_local_rule_wins_over_included_rule() {
    let loader = MemoryLoader::new()
        .with("main.wv", "include 'lib.wv'; main = word; word = 'local';")
        .with("lib.wv", "word = 'included';");
    let graph = memory_pipeline(loader).compile_tokenizer_file("main.wv").unwrap().graph;

    assert!(graph.parse(&chars("local")).unwrap().success);
    assert!(!graph.parse(&chars("included")).unwrap().success);
}

#[test]
fn test_missing_include_is_an_error() {
    let loader = MemoryLoader::new().with("main.wv", "include 'nowhere.wv'; main = 'x';");
    assert!(matches!(
        memory_pipeline(loader).compile_tokenizer_file("main.wv"),
        Err(PipelineError::IncludeNotFound { path, .. }) if path == "nowhere.wv"
    ));
}

#[test]
fn test_includes_are_found_on_search_paths() {
    let dir = std::env::temp_dir().join(format!("weave-pipeline-{}", std::process::id()));
    let lib = dir.join("lib");
    fs::create_dir_all(&lib).unwrap();
    fs::write(lib.join("tokens.wv"), "-c num = +{'0'..'9'}; plus = '+'; -a ws = +' ';").unwrap();
    fs::write(
        dir.join("calc.tok"),
        "include 'tokens.wv'; tokens = *token; -r token = ws | num | plus;",
    )
    .unwrap();
    fs::write(dir.join("calc.gram"), "sum = num, *('+', num);").unwrap();

    let config = PipelineConfig {
        search_paths: vec![lib, dir.clone()],
        ..PipelineConfig::default()
    };
    let mut pipeline = Pipeline::new(config).unwrap();
    pipeline.load_tokenizer_file("calc.tok").unwrap();
    pipeline.load_grammar_file("calc.gram").unwrap();

    let output = pipeline.parse("1 + 22 + 333").unwrap();
    assert!(output.success, "{:?}", output.diagnostics);
    assert_eq!(output.tokens.tokens.len(), 5);
    assert_eq!(
        to_sexpr_list(&output.annotations, pipeline.grammar().unwrap()),
        "sum(num, num, num)"
    );

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_reloading_the_tokenizer_drops_the_grammar() {
    let mut pipeline = Pipeline::from_scripts("tokens = *x; x = 'x';", "doc = *x;").unwrap();
    assert!(pipeline.parse("xx").unwrap().success);

    pipeline.load_tokenizer("tokens = *y; y = 'y';").unwrap();
    assert!(pipeline.grammar().is_none());
    assert!(matches!(
        pipeline.parse("yy"),
        Err(PipelineError::NotLoaded { phase: "grammar" })
    ));
}

#[test]
fn test_token_spans_map_back_to_characters() {
    let pipeline = Pipeline::from_scripts(
        "tokens = *token; -r token = ws | word | nl; -a ws = +' '; -c word = +{'a'..'z'}; -a nl = '\\n';",
        "doc = *word;",
    )
    .unwrap();
    let output = pipeline.parse("ab cd\nef 9").unwrap();
    assert!(!output.success);

    let error = output
        .diagnostics
        .iter()
        .find(|diagnostic| diagnostic.severity == Severity::Error)
        .unwrap();
    assert_eq!(error.message, "unexpected character '9'");
    assert_eq!((error.location.line, error.location.column), (2, 4));

    let words: Vec<_> = output
        .annotations
        .iter()
        .flat_map(|doc| doc.children())
        .map(|word| output.char_span(word.span(), 10))
        .collect();
    assert_eq!(words.len(), 3);
    assert_eq!(words[2].start(), 6);
}
