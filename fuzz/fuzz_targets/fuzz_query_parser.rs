#![no_main]

use libfuzzer_sys::fuzz_target;
use traceql::parse;

fuzz_target!(|data: &[u8]| {
    // Convert bytes to string, skip invalid UTF-8
    if let Ok(query) = std::str::from_utf8(data) {
        // The parser should never panic, only return Ok or Err
        if let Ok(root) = parse(query) {
            // Whatever parses must print to something that parses again
            let printed = root.to_string();
            assert!(parse(&printed).is_ok(), "{:?} printed as {:?}", query, printed);
        }
    }
});
