#![no_main]
use libfuzzer_sys::fuzz_target;
use weave::pipeline::{Pipeline, PipelineConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(pipeline) = Pipeline::new(PipelineConfig::default()) else {
        return;
    };

    // Char phase, then the same text as a grammar over a fixed tokenizer.
    let _ = pipeline.compile_tokenizer(source);
    if let Ok(tokens) = pipeline.compile_tokenizer("tokens = *token; -r token = a | b; a = 'a'; b = 'b';") {
        let _ = pipeline.compile_grammar(source, &tokens.graph);
    }
});
