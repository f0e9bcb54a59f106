//! Constrained string generation for label keys, label values and DNS labels.
//!
//! Label syntax:
//! - a *label value* (or the name part of a key) is at most 63 characters,
//!   starts and ends with an alphanumeric, and may contain `-`, `_` and `.`
//!   in between; values may be empty
//! - a *DNS label* is 1-63 characters of lowercase alphanumerics and `-`,
//!   starting and ending with an alphanumeric
//! - a *label key* is an optional `prefix/` (dot-joined DNS labels, at most
//!   253 characters) followed by a non-empty name part
//!
//! The generators pick each character from a byte pair: one byte selects the
//! character class, the other the offset inside it.

use crate::generate::{GenResult, Generator};

const LABEL_MAX_LEN: usize = 63;
const DNS_LABEL_MAX_LEN: usize = 63;
const PREFIX_MAX_LEN: usize = 253;

#[derive(Debug, Clone, Copy)]
struct CharRange {
    first: u8,
    last: u8,
}

impl CharRange {
    const fn new(first: u8, last: u8) -> Self {
        Self { first, last }
    }

    fn choose(self, inc: usize) -> char {
        let count = usize::from(self.last - self.first) + 1;
        char::from(self.first + (inc % count) as u8)
    }
}

const LABEL_EDGE: [CharRange; 3] = [
    CharRange::new(b'0', b'9'),
    CharRange::new(b'a', b'z'),
    CharRange::new(b'A', b'Z'),
];

const LABEL_MIDDLE: [CharRange; 6] = [
    CharRange::new(b'0', b'9'),
    CharRange::new(b'a', b'z'),
    CharRange::new(b'A', b'Z'),
    CharRange::new(b'.', b'.'),
    CharRange::new(b'-', b'-'),
    CharRange::new(b'_', b'_'),
];

const DNS_EDGE: [CharRange; 2] = [CharRange::new(b'0', b'9'), CharRange::new(b'a', b'z')];

const DNS_MIDDLE: [CharRange; 3] = [
    CharRange::new(b'0', b'9'),
    CharRange::new(b'a', b'z'),
    CharRange::new(b'-', b'-'),
];

fn pick(g: &mut Generator<'_, '_>, ranges: &[CharRange]) -> GenResult<char> {
    let class = g.cursor().get_int()?;
    let inc = g.cursor().get_int()?;
    Ok(ranges[class % ranges.len()].choose(inc))
}

fn edged(
    g: &mut Generator<'_, '_>,
    len: usize,
    edge: &[CharRange],
    middle: &[CharRange],
) -> GenResult<String> {
    let mut out = String::with_capacity(len);
    if len == 0 {
        return Ok(out);
    }
    out.push(pick(g, edge)?);
    for _ in 2..len {
        out.push(pick(g, middle)?);
    }
    if len > 1 {
        out.push(pick(g, edge)?);
    }
    Ok(out)
}

/// Generates a label value, or the name part of a label key when
/// `can_be_empty` is false.
pub fn random_label_part(g: &mut Generator<'_, '_>, can_be_empty: bool) -> GenResult<String> {
    let mut len = g.cursor().get_int()? % (LABEL_MAX_LEN + 1);
    if !can_be_empty && len == 0 {
        len = 1;
    }
    edged(g, len, &LABEL_EDGE, &LABEL_MIDDLE)
}

/// Generates a single DNS label.
pub fn random_dns_label(g: &mut Generator<'_, '_>) -> GenResult<String> {
    let mut len = g.cursor().get_int()? % DNS_LABEL_MAX_LEN;
    if len == 0 {
        len = 2;
    }
    edged(g, len, &DNS_EDGE, &DNS_MIDDLE)
}

/// Generates a label key with an optional DNS prefix of one to three labels.
pub fn random_label_key(g: &mut Generator<'_, '_>) -> GenResult<String> {
    let name = random_label_part(g, false)?;
    if !g.cursor().get_bool()? {
        return Ok(name);
    }
    // three labels of at most 62 characters plus dots stay under 253
    let parts = g.cursor().get_int()? % 3 + 1;
    let mut prefix = Vec::with_capacity(parts);
    for _ in 0..parts {
        prefix.push(random_dns_label(g)?);
    }
    Ok(format!("{}/{}", prefix.join("."), name))
}

/// Returns true if `value` is a valid label value (possibly empty).
#[must_use]
pub fn is_valid_label_value(value: &str) -> bool {
    value.is_empty() || is_label_name(value)
}

fn is_label_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            bytes.len() <= LABEL_MAX_LEN
                && first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        },
        _ => false,
    }
}

/// Returns true if `label` is a valid DNS label.
#[must_use]
pub fn is_dns_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    let edge_ok = |b: &u8| b.is_ascii_digit() || b.is_ascii_lowercase();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            bytes.len() <= DNS_LABEL_MAX_LEN
                && edge_ok(first)
                && edge_ok(last)
                && bytes.iter().all(|b| edge_ok(b) || *b == b'-')
        },
        _ => false,
    }
}

/// Returns true if `key` is a valid label key (`[prefix/]name`).
#[must_use]
pub fn is_qualified_name(key: &str) -> bool {
    match key.split_once('/') {
        Some((prefix, name)) => {
            !prefix.is_empty()
                && prefix.len() <= PREFIX_MAX_LEN
                && prefix.split('.').all(is_dns_label)
                && is_label_name(name)
        },
        None => is_label_name(key),
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::customize::Customizers;
    use crate::generate::GeneratorLimits;

    fn inputs() -> impl Iterator<Item = Vec<u8>> {
        (0u32..64).map(|seed| {
            (0..4096u32)
                .map(|i| (i.wrapping_mul(2_654_435_761).wrapping_add(seed * 97) >> 7) as u8)
                .collect()
        })
    }

    #[test]
    fn test_generated_label_keys_are_valid() {
        let customizers = Customizers::new();
        for data in inputs() {
            let mut g = Generator::new(&data, &customizers, GeneratorLimits::default());
            while let Ok(key) = random_label_key(&mut g) {
                assert!(is_qualified_name(&key), "invalid key {key:?}");
            }
        }
    }

    #[test]
    fn test_generated_label_values_are_valid() {
        let customizers = Customizers::new();
        for data in inputs() {
            let mut g = Generator::new(&data, &customizers, GeneratorLimits::default());
            while let Ok(value) = random_label_part(&mut g, true) {
                assert!(is_valid_label_value(&value), "invalid value {value:?}");
            }
        }
    }

    #[test]
    fn test_generated_dns_labels_are_valid() {
        let customizers = Customizers::new();
        for data in inputs() {
            let mut g = Generator::new(&data, &customizers, GeneratorLimits::default());
            while let Ok(label) = random_dns_label(&mut g) {
                assert!(is_dns_label(&label), "invalid dns label {label:?}");
            }
        }
    }

    #[test]
    fn test_name_part_is_never_empty() {
        let customizers = Customizers::new();
        // length byte 0 would give an empty part
        let data = [0u8, 1, 1, 0, 0];
        let mut g = Generator::new(&data, &customizers, GeneratorLimits::default());
        assert_eq!(random_label_part(&mut g, false).unwrap(), "b");
    }

    #[test]
    fn test_validators() {
        assert!(is_qualified_name("app"));
        assert!(is_qualified_name("example.com/app-name"));
        assert!(!is_qualified_name("/app"));
        assert!(!is_qualified_name("Example.com/app"));
        assert!(!is_qualified_name("-app"));
        assert!(!is_qualified_name(""));
        assert!(is_valid_label_value(""));
        assert!(is_valid_label_value("v1.2_3"));
        assert!(!is_valid_label_value("v1."));
        assert!(is_dns_label("a-1"));
        assert!(!is_dns_label("a_1"));
        assert!(!is_dns_label(&"a".repeat(64)));
    }
}
