//! Fuzz target for the full round-trip suite.
//!
//! The first input byte selects a kind; the rest drives generation. Every
//! generated instance goes through every configured codec. It verifies:
//!
//! 1. **Round-trip law**: decoding an encoding gives back the instance
//! 2. **Stability**: encoding twice gives identical bytes
//! 3. **No mutation**: encoding leaves the instance unchanged
//!
//! Inputs that run out before the instance is complete are skipped.

#![no_main]

use libfuzzer_sys::fuzz_target;
use schema_roundtrip::{FuzzInput, Harness};
use std::sync::OnceLock;

fn harness() -> &'static Harness {
    static HARNESS: OnceLock<Harness> = OnceLock::new();
    HARNESS.get_or_init(|| match Harness::new() {
        Ok(harness) => harness,
        Err(e) => panic!("cannot build harness: {e}"),
    })
}

fuzz_target!(|input: FuzzInput<'_>| {
    if let Err(e) = harness().verify_input(input) {
        if !e.is_recoverable() {
            match e.violation().and_then(|v| v.to_json_pretty()) {
                Some(report) => panic!("{report}"),
                None => panic!("{e}"),
            }
        }
    }
});
