//! Property-based tests for generation, the codecs and the harness.
//!
//! # Properties Tested
//!
//! - Generation is a pure function of the input bytes
//! - Every generated instance survives the round-trip suite, or the input
//!   ran out
//! - Encoding the same object twice yields the same bytes
//! - Deep copies equal their source
//! - Escaping and label generation stay inside their grammars

mod common;

use common::{binary_codec, customizers, generate, json_codec};
use proptest::prelude::*;
use schema_roundtrip::escape::{path_escape, path_unescape, query_escape, query_unescape};
use schema_roundtrip::label::{
    is_dns_label, is_qualified_name, is_valid_label_value, random_dns_label, random_label_key,
    random_label_part,
};
use schema_roundtrip::model::{ApiGroup, Service, Status, Table};
use schema_roundtrip::{Codec, Generator, GeneratorLimits, Harness, HarnessBuilder, HarnessConfig};
use std::sync::OnceLock;

fn harness() -> &'static Harness {
    static HARNESS: OnceLock<Harness> = OnceLock::new();
    HARNESS.get_or_init(|| Harness::new().unwrap())
}

fn quick_harness() -> &'static Harness {
    static HARNESS: OnceLock<Harness> = OnceLock::new();
    HARNESS.get_or_init(|| {
        HarnessBuilder::new()
            .with_config(HarnessConfig::quick())
            .build()
            .unwrap()
    })
}

fn input_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..6144)
}

// ============================================================================
// Harness
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Any input either verifies cleanly or is skipped.
    #[test]
    fn prop_every_input_upholds_or_skips(data in input_strategy(), index in 0usize..64) {
        match harness().verify(&data, index) {
            Ok(report) => prop_assert!(report.is_fully_upheld(), "{}", report),
            Err(e) => prop_assert!(e.is_recoverable(), "{}", e),
        }
    }

    /// Small limits and a single codec behave the same way.
    #[test]
    fn prop_quick_config_upholds_or_skips(data in input_strategy(), index in 0usize..64) {
        match quick_harness().verify(&data, index) {
            Ok(report) => {
                prop_assert_eq!(report.outcomes.len(), 1);
                prop_assert!(report.is_fully_upheld(), "{}", report);
            },
            Err(e) => prop_assert!(e.is_recoverable(), "{}", e),
        }
    }

    /// The same bytes and index give the same result.
    #[test]
    fn prop_verification_is_deterministic(data in input_strategy(), index in 0usize..64) {
        prop_assert_eq!(harness().verify(&data, index), harness().verify(&data, index));
    }
}

// ============================================================================
// Generation and codecs
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn prop_generation_is_deterministic(data in input_strategy()) {
        let a = generate::<Service>(&data);
        let b = generate::<Service>(&data);
        prop_assert_eq!(a.is_ok(), b.is_ok());
        if let (Ok(a), Ok(b)) = (a, b) {
            prop_assert_eq!(a, b);
        }
    }

    #[test]
    fn prop_deep_copy_equals_source(data in input_strategy()) {
        if let Ok(table) = generate::<Table>(&data) {
            let copy = table.clone();
            prop_assert_eq!(copy, table);
        }
    }

    #[test]
    fn prop_encoding_is_stable(data in input_strategy()) {
        if let Ok(status) = generate::<Status>(&data) {
            let json = json_codec();
            prop_assert_eq!(json.encode(&status).unwrap(), json.encode(&status).unwrap());
            let binary = binary_codec();
            prop_assert_eq!(binary.encode(&status).unwrap(), binary.encode(&status).unwrap());
        }
    }

    /// `decode(encode(o)) == o` for a dual-representation kind.
    #[test]
    fn prop_decode_inverts_encode(data in input_strategy()) {
        if let Ok(group) = generate::<ApiGroup>(&data) {
            let json = json_codec();
            let decoded: ApiGroup = json.decode(&json.encode(&group).unwrap()).unwrap();
            prop_assert_eq!(&decoded, &group);
            let binary = binary_codec();
            let decoded: ApiGroup = binary.decode(&binary.encode(&group).unwrap()).unwrap();
            prop_assert_eq!(&decoded, &group);
        }
    }
}

// ============================================================================
// Escaping and labels
// ============================================================================

proptest! {
    #[test]
    fn prop_path_escape_inverts(s in ".*") {
        let escaped = path_escape(&s);
        prop_assert!(!escaped.contains(['/', '?', '#']));
        prop_assert_eq!(path_unescape(&escaped), Some(s));
    }

    #[test]
    fn prop_query_escape_inverts(s in ".*") {
        let escaped = query_escape(&s);
        prop_assert!(!escaped.contains(['&', '=', '#', ' ']));
        prop_assert_eq!(query_unescape(&escaped), Some(s));
    }

    #[test]
    fn prop_generated_labels_are_valid(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let customizers = customizers();
        let mut g = Generator::new(&data, &customizers, GeneratorLimits::default());
        if let Ok(value) = random_label_part(&mut g, true) {
            prop_assert!(is_valid_label_value(&value), "{:?}", value);
        }
        if let Ok(key) = random_label_key(&mut g) {
            prop_assert!(is_qualified_name(&key), "{:?}", key);
        }
        if let Ok(label) = random_dns_label(&mut g) {
            prop_assert!(is_dns_label(&label), "{:?}", label);
        }
    }
}
