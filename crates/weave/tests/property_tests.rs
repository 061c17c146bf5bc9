//! Property-based tests for matching, evaluation and script compilation
//!
//! These tests use proptest to generate inputs and check invariants that
//! must hold for every one of them.

#![cfg(test)]

use proptest::prelude::*;
use weave::grammar::{GraphBuilder, Pruning, RuleDef};
use weave::pipeline::{Pipeline, PipelineConfig};
use weave::syntax::to_sexpr_list;

const CALC_TOKENS: &str = "
    tokens = *token;
    -r token = ws | num | plus | star;
    -a ws = +' ';
    -c num = +{'0'..'9'};
    plus = '+';
    star = '*';
";

const CALC_GRAMMAR: &str = "
    expr = add / mult / num;
    add 10 = expr, '+', expr;
    mult 20 = expr, '*', expr;
";

#[derive(Debug, Clone, Copy)]
enum Op {
    Add,
    Mult,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Add), Just(Op::Mult)]
}

fn pruning_strategy() -> impl Strategy<Value = Pruning> {
    prop_oneof![
        Just(Pruning::None),
        Just(Pruning::Root),
        Just(Pruning::All),
        Just(Pruning::Children),
    ]
}

/// Tree expected for `n op n op n ...` with `*` binding tighter than `+`
/// and both associating to the left.
fn expected_tree(ops: &[Op]) -> String {
    let mut sums: Vec<String> = Vec::new();
    let mut product = "num".to_string();
    for op in ops {
        match op {
            Op::Mult => product = format!("mult({product}, num)"),
            Op::Add => {
                sums.push(product);
                product = "num".to_string();
            }
        }
    }
    sums.push(product);

    let mut terms = sums.into_iter();
    let first = terms.next().unwrap_or_default();
    terms.fold(first, |acc, term| format!("add({acc}, {term})"))
}

proptest! {
    #[test]
    fn evaluation_matches_precedence_climbing(
        numbers in prop::collection::vec(0u32..1000, 1..10),
        ops in prop::collection::vec(op_strategy(), 9),
    ) {
        let ops = &ops[..numbers.len() - 1];
        let mut text = numbers[0].to_string();
        for (op, number) in ops.iter().zip(&numbers[1..]) {
            let symbol = match op {
                Op::Add => '+',
                Op::Mult => '*',
            };
            text.push_str(&format!(" {symbol} {number}"));
        }

        let pipeline = Pipeline::from_scripts(CALC_TOKENS, CALC_GRAMMAR).unwrap();
        let output = pipeline.parse(&text).unwrap();
        prop_assert!(output.success, "{text}: {:?}", output.diagnostics);
        prop_assert_eq!(
            to_sexpr_list(&output.annotations, pipeline.grammar().unwrap()),
            expected_tree(ops)
        );
    }

    #[test]
    fn pruning_never_changes_match_length(word in "[a-z]{1,20}", pruning in pruning_strategy()) {
        let mut b = GraphBuilder::new();
        let letter = b.define("letter", RuleDef::range('a', 'z'));
        let root = b.define("word", RuleDef::count(letter, 1, 0).pruning(pruning));
        b.set_root(root);
        let graph = b.finish().unwrap();

        let input: Vec<char> = word.chars().collect();
        let result = graph.parse(&input).unwrap();
        prop_assert!(result.success);
        prop_assert_eq!(result.len, input.len());

        let expected = match pruning {
            Pruning::None | Pruning::Children => 1,
            Pruning::Root => input.len(),
            Pruning::All => 0,
        };
        prop_assert_eq!(result.annotations.len(), expected);
    }

    #[test]
    fn stop_at_skips_exactly_the_prefix(prefix in "[ac-z]{0,20}", stop_after in any::<bool>()) {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let script = if stop_after { "s = stop_after 'bar';" } else { "s = stop_at 'bar';" };
        let graph = pipeline.compile_tokenizer(script).unwrap().graph;

        let input: Vec<char> = format!("{prefix}bar").chars().collect();
        let result = graph.parse(&input).unwrap();
        prop_assert!(result.success);
        let expected = if stop_after { prefix.len() + 3 } else { prefix.len() };
        prop_assert_eq!(result.len, expected);
    }

    #[test]
    fn compiling_arbitrary_scripts_never_panics(source in "[a-z0-9 ='|/,;*+?(){}\\[\\].\\-]{0,48}") {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let _ = pipeline.compile_tokenizer(&source);
    }
}
