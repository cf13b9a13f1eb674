#![no_main]

use libfuzzer_sys::fuzz_target;
use scowatch_log_pipeline::rule::{RuleFormat, RuleLoader};

fuzz_target!(|data: &[u8]| {
    // Both parsers take &str
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = RuleLoader::parse(text, RuleFormat::Json, "fuzz-input.json");
        let _ = RuleLoader::parse(text, RuleFormat::Yaml, "fuzz-input.yml");
    }
});
