#![no_main]
use libfuzzer_sys::fuzz_target;
use weave::pipeline::Pipeline;

const TOKENIZER: &str = "
    tokens = *token;
    -r token = ws | num | ident | plus | star | lparen | rparen | semi;
    -a ws = +{' ' '\\n' '\\t'};
    -c num = +{'0'..'9'};
    -c ident = {'a'..'z'}, *{'a'..'z'};
    plus = '+';
    star = '*';
    lparen = '(';
    rparen = ')';
    semi = ';';
";

const GRAMMAR: &str = "
    doc = *statement;
    -r statement = (expr, ';') | bad;
    bad = error 'expected an expression', ., stop_after ';';
    expr = add / mult / atom;
    add 10 = expr, '+', expr;
    mult 20 = expr, '*', expr;
    -r atom = num | ident | ('(', expr, ')');
";

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(pipeline) = Pipeline::from_scripts(TOKENIZER, GRAMMAR) else {
        return;
    };
    if let Ok(output) = pipeline.parse(text) {
        for diagnostic in &output.diagnostics {
            assert!(diagnostic.location.line >= 1);
        }
    }
});
