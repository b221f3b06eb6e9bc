//! Fuzz target for X-AnyLabeling JSON parsing.
//!
//! This fuzzer feeds arbitrary byte sequences to the annotation file
//! parser and converts every parsed shape to a box, checking for panics,
//! crashes, or hangs.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mangalabel::ir::io_anylabeling::fuzz_parse_anylabeling_json;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = fuzz_parse_anylabeling_json(data);
});
