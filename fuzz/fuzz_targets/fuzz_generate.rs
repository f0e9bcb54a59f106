//! Fuzz target for instance generation alone.
//!
//! Generates a few representative types from the same bytes twice and
//! checks:
//!
//! 1. **Only exhaustion fails**: customizers never report anything else
//! 2. **Determinism**: the same bytes give the same instance
//! 3. **Blank tags**: generated instances carry no type tag

#![no_main]

use libfuzzer_sys::fuzz_target;
use schema_roundtrip::model::{ApiGroup, ListOptions, Service, Status, Table, WatchEvent};
use schema_roundtrip::{Harness, Object};
use std::sync::OnceLock;

fn harness() -> &'static Harness {
    static HARNESS: OnceLock<Harness> = OnceLock::new();
    HARNESS.get_or_init(|| match Harness::new() {
        Ok(harness) => harness,
        Err(e) => panic!("cannot build harness: {e}"),
    })
}

fn check<T: Object>(data: &[u8]) {
    let first = harness().generate::<T>(data);
    let second = harness().generate::<T>(data);
    match (first, second) {
        (Ok(a), Ok(b)) => {
            assert_eq!(a, b, "{} generation is not deterministic", T::type_name());
            assert!(a.type_meta().is_empty(), "{} carries a tag", T::type_name());
        },
        (Err(a), Err(b)) => {
            assert!(a.is_recoverable(), "{a}");
            assert_eq!(a, b);
        },
        (a, b) => panic!("{}: {a:?} then {b:?}", T::type_name()),
    }
}

fuzz_target!(|data: &[u8]| {
    check::<Status>(data);
    check::<ApiGroup>(data);
    check::<ListOptions>(data);
    check::<WatchEvent>(data);
    check::<Table>(data);
    check::<Service>(data);
});
