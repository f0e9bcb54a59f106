//! Fixed scenarios for the generation rules that keep objects faithful to
//! their encodings.

mod common;

use common::{customizers, fuzz_bytes, generate, json_codec, SEEDS};
use schema_roundtrip::customize::fuzz_conditions;
use schema_roundtrip::escape::{path_unescape, query_unescape};
use schema_roundtrip::model::{LabelSelector, ObjectMeta, Service, ServiceStatus, Status, Url};
use schema_roundtrip::{Codec, GenError, Generator, GeneratorLimits, GroupVersionKind};
use std::collections::BTreeMap;

fn service_kind() -> GroupVersionKind {
    GroupVersionKind::new("serving.knative.dev", "v1", "Service")
}

#[test]
fn fuzzed_conditions_keep_their_types_through_json() {
    let customizers = customizers();
    let data = fuzz_bytes(21);
    let mut g = Generator::new(&data, &customizers, GeneratorLimits::default());

    let mut status = ServiceStatus::default();
    status.initialize_conditions();
    let initial = status.conditions.clone();
    assert_eq!(initial.len(), 3);
    fuzz_conditions(&mut status, &mut g).unwrap();
    assert_ne!(status.conditions, initial);

    let service = Service {
        type_meta: service_kind().to_type_meta(),
        status,
        ..Service::default()
    };
    let codec = json_codec();
    let data = codec.encode(&service).unwrap();
    let decoded: Service = codec.decode(&data).unwrap();

    for (before, after) in initial.iter().zip(&decoded.status.conditions) {
        assert_eq!(before.condition_type, after.condition_type);
    }
    assert_eq!(decoded.status.conditions, service.status.conditions);
}

#[test]
fn blank_label_keys_leave_labels_absent() {
    let mut customizers = customizers();
    customizers.register::<BTreeMap<String, String>, _>(|map, g| {
        map.clear();
        map.insert(String::new(), g.cursor().get_string(8)?);
        Ok(())
    });

    let mut generated = 0;
    for seed in 0..SEEDS {
        let data = fuzz_bytes(seed);
        let mut g = Generator::new(&data, &customizers, GeneratorLimits::default());
        let mut meta = ObjectMeta::default();
        if let Err(e) = g.generate(&mut meta) {
            assert!(matches!(e, GenError::Exhausted(_)), "{e}");
            continue;
        }
        assert_eq!(meta.labels, None);
        assert_eq!(meta.annotations, None);

        let service = Service {
            type_meta: service_kind().to_type_meta(),
            metadata: meta,
            ..Service::default()
        };
        let codec = json_codec();
        let decoded: Service = codec.decode(&codec.encode(&service).unwrap()).unwrap();
        assert_eq!(decoded.metadata, service.metadata);
        generated += 1;
    }
    assert!(generated > 0);
}

#[test]
fn generated_label_maps_are_absent_or_non_empty() {
    for seed in 0..64 {
        let Ok(meta) = generate::<ObjectMeta>(&fuzz_bytes(seed)) else {
            continue;
        };
        for map in [&meta.labels, &meta.annotations].into_iter().flatten() {
            assert!(!map.is_empty());
            assert!(!map.contains_key(""));
        }
        assert!(meta.owner_references.as_ref().is_none_or(|v| !v.is_empty()));
        assert!(meta.finalizers.as_ref().is_none_or(|v| !v.is_empty()));
    }
}

#[test]
fn selectors_are_never_empty_and_canonical() {
    let mut inputs: Vec<Vec<u8>> = (0..64).map(fuzz_bytes).collect();
    inputs.push(vec![0; 256]);
    for data in &inputs {
        let Ok(selector) = generate::<LabelSelector>(data) else {
            continue;
        };
        assert!(!selector.is_empty(), "{selector:?}");
        if selector.match_labels.as_ref().is_none_or(BTreeMap::is_empty) {
            let expressions = selector.match_expressions.as_ref().unwrap();
            assert!(!expressions.is_empty());
        }
        let mut canonical = selector.clone();
        canonical.canonicalize();
        assert_eq!(canonical, selector);
    }
}

#[test]
fn url_separators_are_escaped() {
    for seed in 0..64 {
        let Ok(url) = generate::<Url>(&fuzz_bytes(seed)) else {
            continue;
        };
        assert!(!url.raw_path.contains(['/', '?', '#']), "{}", url.raw_path);
        assert!(
            !url.raw_query.contains(['&', '=', '#', ' ']),
            "{}",
            url.raw_query
        );
        assert!(path_unescape(&url.raw_path).is_some());
        assert!(query_unescape(&url.raw_query).is_some());
        assert_eq!(url.to_string().parse::<Url>().unwrap(), url);
    }
}

#[test]
fn decode_into_reconciles_with_the_untagged_form() {
    let codec = json_codec();
    let original = Status {
        status: "Failure".to_owned(),
        reason: "Conflict".to_owned(),
        code: 409,
        ..Status::default()
    };
    let data = codec.encode(&original).unwrap();

    let decoded: Status = codec.decode(&data).unwrap();
    assert_eq!(decoded, original);

    let mut decoded_into = Status::default();
    codec.decode_into(&data, &mut decoded_into).unwrap();
    assert_eq!(decoded_into.type_meta.kind, "Status");
    assert_ne!(decoded_into, original);

    decoded_into.type_meta.clear();
    assert_eq!(decoded_into, original);
}
