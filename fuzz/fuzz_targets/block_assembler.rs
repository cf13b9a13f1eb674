#![no_main]

use libfuzzer_sys::fuzz_target;
use scowatch_log_pipeline::assembler::BlockAssembler;

const MAX_BLOCK_BYTES: usize = 64 * 1024;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let Ok(mut assembler) = BlockAssembler::new(MAX_BLOCK_BYTES) else {
        return;
    };

    for line in text.split_inclusive('\n') {
        if let Some(block) = assembler.push_line(line) {
            // A block is only emitted once its closing bracket was seen
            assert!(block.content.len() <= MAX_BLOCK_BYTES);
            assert!(!block.timestamp.is_empty());
        }
    }
});
