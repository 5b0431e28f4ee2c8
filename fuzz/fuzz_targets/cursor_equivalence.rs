#![no_main]

use cordyceps_seqtree::model::CursorEquivalenceInput;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: CursorEquivalenceInput| {
    cordyceps_seqtree::model::run_cursor_equivalence(input.values, input.ops);
});
