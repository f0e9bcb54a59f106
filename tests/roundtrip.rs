//! End-to-end verification through the harness.

mod common;

use common::{fuzz_bytes, init_tracing, SEEDS};
use schema_roundtrip::model::{GetOptions, Status};
use schema_roundtrip::{
    impl_fill, impl_object, CodecKind, CollectingObserver, GroupVersionKind, Harness,
    HarnessBuilder, HarnessConfig, Outcome, RoundTripError, RoundTripStep, Scheme, TypeMeta,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

fn assert_clean(result: Result<schema_roundtrip::Report, RoundTripError>, context: &str) {
    match result {
        Ok(report) => assert!(report.is_fully_upheld(), "{context}: {report}"),
        Err(e) => assert!(e.is_recoverable(), "{context}: {e}"),
    }
}

#[test]
fn every_kind_round_trips_with_default_config() {
    let harness = Harness::new().unwrap();
    let kinds = harness.selectable_kinds().len();
    for seed in 0..SEEDS {
        let data = fuzz_bytes(seed);
        for index in 0..kinds {
            assert_clean(
                harness.verify(&data, index),
                &format!("seed {seed} kind {index}"),
            );
        }
    }
}

#[test]
fn every_kind_round_trips_with_thorough_config() {
    let harness = HarnessBuilder::new()
        .with_config(HarnessConfig::thorough())
        .build()
        .unwrap();
    let kinds = harness.selectable_kinds().len();
    for seed in 100..100 + SEEDS {
        let data = fuzz_bytes(seed);
        for index in 0..kinds {
            assert_clean(
                harness.verify(&data, index),
                &format!("seed {seed} kind {index}"),
            );
        }
    }
}

#[test]
fn selection_wraps_around() {
    let harness = Harness::new().unwrap();
    let kinds = harness.selectable_kinds().len();
    let data = fuzz_bytes(3);
    let a = harness.verify(&data, 1);
    let b = harness.verify(&data, 1 + kinds);
    assert_eq!(a, b);
}

#[test]
fn verification_is_deterministic() {
    let harness = Harness::new().unwrap();
    for index in 0..harness.selectable_kinds().len() {
        let data = fuzz_bytes(77);
        assert_eq!(harness.verify(&data, index), harness.verify(&data, index));
    }
}

#[test]
fn short_input_is_skipped_not_reported() {
    init_tracing();
    let observer = Arc::new(CollectingObserver::new());
    let harness = HarnessBuilder::new()
        .with_violation_observer(observer.clone())
        .build()
        .unwrap();
    for index in 0..harness.selectable_kinds().len() {
        let err = harness.verify(&[], index).unwrap_err();
        assert!(matches!(err, RoundTripError::Exhausted(_)), "{err}");
    }
    assert!(observer.is_empty());
}

#[test]
fn dual_kind_is_verified_untagged() {
    let harness = Harness::new().unwrap();
    let status = Status {
        status: "Failure".to_owned(),
        code: 409,
        ..Status::default()
    };
    let report = harness.verify_object(&status, None).unwrap();
    assert_eq!(report.outcomes.len(), 2);
    assert!(report.is_fully_upheld());
}

#[test]
fn untagged_external_only_kind_is_a_violation() {
    init_tracing();
    let observer = Arc::new(CollectingObserver::new());
    let harness = HarnessBuilder::new()
        .with_violation_observer(observer.clone())
        .build()
        .unwrap();
    let options = GetOptions::default();
    let err = harness.verify_object(&options, None).unwrap_err();
    let violation = err.violation().unwrap();
    assert_eq!(violation.step, RoundTripStep::DecodeEquality);
    assert!(violation.encoded.is_some());
    assert_eq!(observer.len(), 1);

    let gvk = GroupVersionKind::new("meta.k8s.io", "v1", "GetOptions");
    let tagged = GetOptions {
        type_meta: gvk.to_type_meta(),
        ..GetOptions::default()
    };
    assert!(harness.verify_object(&tagged, Some(&gvk)).unwrap().is_fully_upheld());
}

#[test]
fn type_without_external_kind_is_unsupported() {
    init_tracing();
    let mut scheme = Scheme::new();
    scheme
        .register::<Status>(GroupVersionKind::new("meta.k8s.io", "v1", "Status"))
        .unwrap();
    let harness = HarnessBuilder::new()
        .with_scheme(scheme)
        .with_config(HarnessConfig {
            codecs: vec![CodecKind::Json],
            ..HarnessConfig::default()
        })
        .build()
        .unwrap();
    let report = harness.verify_object(&GetOptions::default(), None).unwrap();
    assert!(matches!(
        report.outcomes[0].outcome,
        Outcome::Unsupported { .. }
    ));
    assert_eq!(report.unsupported_codecs(), ["json"]);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Widget {
    type_meta: TypeMeta,
    size: u32,
    tags: BTreeMap<String, String>,
    parts: Vec<i64>,
}

impl_fill!(Widget {
    type_meta,
    size,
    tags,
    parts
});
impl_object!(Widget);

#[test]
fn caller_defined_kind_round_trips() {
    let mut scheme = Scheme::new();
    scheme
        .register::<Widget>(GroupVersionKind::new("example.dev", "v2", "Widget"))
        .unwrap();
    let harness = HarnessBuilder::new().with_scheme(scheme).build().unwrap();
    assert_eq!(harness.selectable_kinds().len(), 1);
    for seed in 0..SEEDS {
        let report = match harness.verify(&fuzz_bytes(seed), seed as usize) {
            Ok(report) => report,
            Err(e) => {
                assert!(e.is_recoverable(), "{e}");
                continue;
            },
        };
        assert_eq!(report.type_name, "Widget");
        assert_eq!(report.kind.as_deref(), Some("example.dev/v2, Kind=Widget"));
        assert!(report.is_fully_upheld());
    }
}

#[test]
fn caller_customizer_overrides_the_default() {
    let harness = HarnessBuilder::new()
        .with_customizer::<Status, _>(|s, g| {
            g.generate_default(s)?;
            s.code = 418;
            Ok(())
        })
        .build()
        .unwrap();
    let status: Status = harness.generate(&fuzz_bytes(4)).unwrap();
    assert_eq!(status.code, 418);
    assert!(status.type_meta.is_empty());
}

#[test]
fn report_serializes_to_json() {
    let harness = Harness::new().unwrap();
    let report = harness.verify_object(&Status::default(), None).unwrap();
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains(r#""outcome":"upheld""#), "{json}");
    assert!(json.contains(r#""codec":"binary""#), "{json}");
}

#[test]
fn every_registered_version_is_reported_as_selected() {
    let harness = Harness::new().unwrap();
    let kinds = harness.selectable_kinds();
    let index = kinds
        .iter()
        .position(|g| g.kind == "Table" && g.version == "v1beta1")
        .unwrap();
    for seed in 0..SEEDS {
        match harness.verify(&fuzz_bytes(seed), index) {
            Ok(report) => {
                assert_eq!(report.kind.as_deref(), Some("meta.k8s.io/v1beta1, Kind=Table"));
                assert!(report.is_fully_upheld(), "{report}");
            },
            Err(e) => assert!(e.is_recoverable(), "{e}"),
        }
    }
}
