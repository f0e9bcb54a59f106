//! Customizers for object metadata.

use super::Customizers;
use crate::generate::{GenResult, Generator};
use crate::label::{random_label_key, random_label_part};
use crate::model::{
    LabelSelector, LabelSelectorOperator, LabelSelectorRequirement, ListMeta, ManagedFieldsEntry,
    ObjectMeta, ResourceVersionMatch, Time, TypeMeta,
};
use std::collections::BTreeMap;

/// Seconds in a thousand 365-day years.
pub const THOUSAND_YEARS_SECS: u64 = 1000 * 365 * 24 * 60 * 60;

const NAME_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz-1234567890";
const UID_MAX_LEN: usize = 63;
const NAME_MAX_LEN: usize = 20;

pub(super) fn register(customizers: &mut Customizers) {
    customizers.register::<Time, _>(time);
    customizers.register::<TypeMeta, _>(type_meta);
    customizers.register::<ObjectMeta, _>(object_meta);
    customizers.register::<ResourceVersionMatch, _>(resource_version_match);
    customizers.register::<ListMeta, _>(list_meta);
    customizers.register::<LabelSelector, _>(label_selector);
    customizers.register::<ManagedFieldsEntry, _>(managed_fields_entry);
}

/// Whole seconds within a thousand years of the epoch.
pub fn time(t: &mut Time, g: &mut Generator<'_, '_>) -> GenResult<()> {
    let secs = g.cursor().get_u64()? % THOUSAND_YEARS_SECS;
    *t = Time::from_unix(secs as i64, 0).unwrap_or_default();
    Ok(())
}

/// Type tags stay blank in memory; codecs stamp them.
pub fn type_meta(t: &mut TypeMeta, _g: &mut Generator<'_, '_>) -> GenResult<()> {
    t.clear();
    Ok(())
}

/// A timestamp from 32-bit seconds and nanoseconds, truncated to whole
/// seconds so it survives the textual form.
fn small_timestamp(g: &mut Generator<'_, '_>) -> GenResult<Time> {
    let secs = g.cursor().get_u32()?;
    let nanos = g.cursor().get_u32()?;
    Ok(Time::from_unix(i64::from(secs), i64::from(nanos))
        .unwrap_or_default()
        .rfc3339_copy())
}

fn normalize_map(map: &mut Option<BTreeMap<String, String>>) {
    if let Some(entries) = map {
        entries.remove("");
    }
    if map.as_ref().is_some_and(BTreeMap::is_empty) {
        *map = None;
    }
}

fn normalize_vec<T>(items: &mut Option<Vec<T>>) {
    if items.as_ref().is_some_and(Vec::is_empty) {
        *items = None;
    }
}

/// Structural metadata with parseable identifiers and timestamps. Empty
/// maps and lists end up absent.
pub fn object_meta(m: &mut ObjectMeta, g: &mut Generator<'_, '_>) -> GenResult<()> {
    g.generate_default(m)?;

    m.resource_version = g.cursor().get_int()?.to_string();
    m.uid = g.cursor().get_string_from(NAME_CHARS, UID_MAX_LEN)?;
    m.name = g.cursor().get_string_from(NAME_CHARS, NAME_MAX_LEN)?;

    m.creation_timestamp = small_timestamp(g)?;
    if m.deletion_timestamp.is_some() {
        m.deletion_timestamp = Some(small_timestamp(g)?);
    }

    normalize_map(&mut m.labels);
    normalize_map(&mut m.annotations);
    normalize_vec(&mut m.owner_references);
    normalize_vec(&mut m.finalizers);
    Ok(())
}

/// One of the three recognised match modes.
pub fn resource_version_match(
    m: &mut ResourceVersionMatch,
    g: &mut Generator<'_, '_>,
) -> GenResult<()> {
    const MODES: [&str; 3] = [
        "",
        ResourceVersionMatch::EXACT,
        ResourceVersionMatch::NOT_OLDER_THAN,
    ];
    m.0 = MODES[g.cursor().get_int()? % MODES.len()].to_owned();
    Ok(())
}

/// Decimal resource version and a free-form self link.
pub fn list_meta(m: &mut ListMeta, g: &mut Generator<'_, '_>) -> GenResult<()> {
    m.resource_version = g.cursor().get_u64()?.to_string();
    let max = g.limits().max_string_len;
    m.self_link = g.cursor().get_string(max)?;
    Ok(())
}

/// A selector with at least one clause, valid keys and values, in the
/// canonical order decoding produces.
pub fn label_selector(s: &mut LabelSelector, g: &mut Generator<'_, '_>) -> GenResult<()> {
    g.generate_default(s)?;

    if s.is_empty() {
        let len = g.cursor().get_int()? % 3 + 1;
        s.match_expressions = Some(vec![LabelSelectorRequirement::default(); len]);
    }

    if let Some(labels) = &mut s.match_labels {
        let len = labels.len();
        let mut fresh = BTreeMap::new();
        for _ in 0..len {
            let value = random_label_part(g, true)?;
            let key = random_label_key(g)?;
            fresh.insert(key, value);
        }
        *labels = fresh;
    }

    if let Some(expressions) = &mut s.match_expressions {
        for slot in expressions.iter_mut() {
            let mut requirement = LabelSelectorRequirement::default();
            g.generate_default(&mut requirement)?;
            requirement.key = random_label_key(g)?;
            requirement.operator =
                LabelSelectorOperator::ALL[g.cursor().get_int()? % LabelSelectorOperator::ALL.len()];
            requirement.values = if requirement.operator.takes_values() {
                let mut values = requirement.values.take().unwrap_or_default();
                if values.is_empty() {
                    values = vec![String::new(); g.cursor().get_int()? % 3 + 1];
                }
                for value in &mut values {
                    *value = random_label_part(g, true)?;
                }
                values.sort();
                Some(values)
            } else {
                None
            };
            *slot = requirement;
        }
        expressions.sort_by(|a, b| a.key.cmp(&b.key));
    }
    Ok(())
}

/// Field sets are opaque to the codecs and left unset.
pub fn managed_fields_entry(
    e: &mut ManagedFieldsEntry,
    g: &mut Generator<'_, '_>,
) -> GenResult<()> {
    g.generate_default(e)?;
    e.fields_v1 = None;
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::super::test_support::{bytes, defaults, generate};
    use super::*;
    use crate::generate::GeneratorLimits;
    use crate::label::{is_qualified_name, is_valid_label_value};

    #[test]
    fn test_time_is_whole_seconds_within_range() {
        let customizers = defaults();
        for seed in 0..32 {
            let t: Time = generate(&customizers, &bytes(seed)).unwrap();
            assert_eq!(t.subsec_nanos(), 0);
            assert!(t.unix_seconds() >= 0);
            assert!((t.unix_seconds() as u64) < THOUSAND_YEARS_SECS);
        }
    }

    #[test]
    fn test_type_meta_is_blank() {
        let customizers = defaults();
        let t: TypeMeta = generate(&customizers, &bytes(1)).unwrap();
        assert!(t.is_empty());
    }

    #[test]
    fn test_object_meta_normalizes_empty_collections() {
        let customizers = defaults();
        for seed in 0..64 {
            let Ok(m) = generate::<ObjectMeta>(&customizers, &bytes(seed)) else {
                continue;
            };
            assert!(m.labels.as_ref().is_none_or(|l| !l.is_empty() && !l.contains_key("")));
            assert!(m
                .annotations
                .as_ref()
                .is_none_or(|a| !a.is_empty() && !a.contains_key("")));
            assert!(m.owner_references.as_ref().is_none_or(|o| !o.is_empty()));
            assert!(m.finalizers.as_ref().is_none_or(|f| !f.is_empty()));
            assert_eq!(m.creation_timestamp.subsec_nanos(), 0);
            assert!(m.uid.len() <= UID_MAX_LEN);
            assert!(m.name.len() <= NAME_MAX_LEN);
            assert!(m.resource_version.parse::<u8>().is_ok());
        }
    }

    #[test]
    fn test_blank_label_key_alone_yields_absent_labels() {
        let mut labels = Some(BTreeMap::from([(String::new(), "v".to_owned())]));
        normalize_map(&mut labels);
        assert_eq!(labels, None);

        let mut labels = Some(BTreeMap::from([
            (String::new(), "v".to_owned()),
            ("k".to_owned(), "v".to_owned()),
        ]));
        normalize_map(&mut labels);
        assert_eq!(labels.unwrap().len(), 1);
    }

    #[test]
    fn test_resource_version_match_is_known_mode() {
        let customizers = defaults();
        for seed in 0..16 {
            let m: ResourceVersionMatch = generate(&customizers, &bytes(seed)).unwrap();
            assert!(["", "Exact", "NotOlderThan"].contains(&m.0.as_str()));
        }
    }

    #[test]
    fn test_list_meta_resource_version_is_decimal() {
        let customizers = defaults();
        let m: ListMeta = generate(&customizers, &bytes(3)).unwrap();
        assert!(m.resource_version.parse::<u64>().is_ok());
    }

    #[test]
    fn test_label_selector_is_never_empty_and_canonical() {
        let customizers = defaults();
        for seed in 0..64 {
            let Ok(s) = generate::<LabelSelector>(&customizers, &bytes(seed)) else {
                continue;
            };
            assert!(!s.is_empty(), "seed {seed}");
            for (key, value) in s.match_labels.iter().flatten() {
                assert!(is_qualified_name(key), "{key:?}");
                assert!(is_valid_label_value(value), "{value:?}");
            }
            let expressions = s.match_expressions.clone().unwrap_or_default();
            let mut canonical = s.clone();
            canonical.canonicalize();
            assert_eq!(canonical, s);
            for requirement in expressions {
                assert!(is_qualified_name(&requirement.key));
                match requirement.values {
                    Some(values) => {
                        assert!(requirement.operator.takes_values());
                        assert!(!values.is_empty());
                    },
                    None => assert!(!requirement.operator.takes_values()),
                }
            }
        }
    }

    #[test]
    fn test_empty_selector_gets_expressions() {
        // all-zero input: both optional collections come out absent
        let customizers = defaults();
        let data = vec![0u8; 1024];
        let mut g = Generator::new(&data, &customizers, GeneratorLimits::default());
        let mut s = LabelSelector::default();
        label_selector(&mut s, &mut g).unwrap();
        assert_eq!(s.match_labels, None);
        assert_eq!(s.match_expressions.unwrap().len(), 1);
    }

    #[test]
    fn test_managed_fields_have_no_field_set() {
        let customizers = defaults();
        for seed in 0..16 {
            if let Ok(e) = generate::<ManagedFieldsEntry>(&customizers, &bytes(seed)) {
                assert_eq!(e.fields_v1, None);
            }
        }
    }

    #[test]
    fn test_exhaustion_propagates() {
        let customizers = defaults();
        assert!(generate::<ObjectMeta>(&customizers, &[0; 3]).is_err());
    }
}
