#![no_main]

use cordyceps_seqtree::model::{run_deque_equivalence, Op};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|ops: Vec<Op>| { run_deque_equivalence(ops) });
