#![no_main]

use libfuzzer_sys::fuzz_target;
use scowatch_log_pipeline::parser::FieldExtractor;

fuzz_target!(|data: &[u8]| {
    // Blocks reach the extractor as lossily decoded text
    let text = String::from_utf8_lossy(data);
    let first = FieldExtractor::extract(&text);
    let second = FieldExtractor::extract(&text);
    assert_eq!(first, second);
});
