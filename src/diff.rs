//! Structural diffs for violation reports.
//!
//! Values are compared through their `serde_json` form so the report names
//! the exact field path that differs. When that form cannot be produced, or
//! hides the difference (a value that differs only in a way its JSON form
//! drops), the diff falls back to comparing pretty `Debug` output line by
//! line.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt::Debug;

/// Cap on reported differences.
const MAX_DIFF_LINES: usize = 64;

/// Lists the differences between `left` and `right`, one line each.
/// Empty only if both render identically.
#[must_use]
pub fn object_diff<T: Serialize + Debug>(left: &T, right: &T) -> Vec<String> {
    let mut out = Vec::new();
    if let (Ok(a), Ok(b)) = (serde_json::to_value(left), serde_json::to_value(right)) {
        diff_values("", &a, &b, &mut out);
    }
    if out.is_empty() {
        out = debug_diff(left, right);
    }
    truncate(out)
}

fn truncate(mut lines: Vec<String>) -> Vec<String> {
    if lines.len() > MAX_DIFF_LINES {
        let more = lines.len() - MAX_DIFF_LINES;
        lines.truncate(MAX_DIFF_LINES);
        lines.push(format!("... {more} more"));
    }
    lines
}

fn show(path: &str) -> &str {
    if path.is_empty() {
        "."
    } else {
        path
    }
}

fn diff_values(path: &str, a: &Value, b: &Value, out: &mut Vec<String>) {
    match (a, b) {
        (Value::Object(left), Value::Object(right)) => {
            let keys: BTreeSet<&String> = left.keys().chain(right.keys()).collect();
            for key in keys {
                let child = format!("{path}.{key}");
                match (left.get(key), right.get(key)) {
                    (Some(l), Some(r)) => diff_values(&child, l, r, out),
                    (Some(l), None) => out.push(format!("{child}: {l} != <missing>")),
                    (None, Some(r)) => out.push(format!("{child}: <missing> != {r}")),
                    (None, None) => {},
                }
            }
        },
        (Value::Array(left), Value::Array(right)) => {
            for i in 0..left.len().max(right.len()) {
                let child = format!("{path}[{i}]");
                match (left.get(i), right.get(i)) {
                    (Some(l), Some(r)) => diff_values(&child, l, r, out),
                    (Some(l), None) => out.push(format!("{child}: {l} != <missing>")),
                    (None, Some(r)) => out.push(format!("{child}: <missing> != {r}")),
                    (None, None) => {},
                }
            }
        },
        _ if a != b => out.push(format!("{}: {a} != {b}", show(path))),
        _ => {},
    }
}

fn debug_diff<T: Debug>(left: &T, right: &T) -> Vec<String> {
    let left = format!("{left:#?}");
    let right = format!("{right:#?}");
    let left: Vec<&str> = left.lines().collect();
    let right: Vec<&str> = right.lines().collect();
    let mut out = Vec::new();
    for i in 0..left.len().max(right.len()) {
        let l = left.get(i).copied();
        let r = right.get(i).copied();
        if l != r {
            out.push(format!(
                "line {}: {} != {}",
                i + 1,
                l.unwrap_or("<missing>").trim(),
                r.unwrap_or("<missing>").trim()
            ));
        }
    }
    out
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
    use crate::model::{ObjectMeta, Time};
    use std::collections::BTreeMap;

    #[test]
    fn test_equal_values_have_no_diff() {
        let meta = ObjectMeta::default();
        assert!(object_diff(&meta, &meta.clone()).is_empty());
    }

    #[test]
    fn test_diff_names_field_path() {
        let a = ObjectMeta {
            name: "a".to_owned(),
            ..ObjectMeta::default()
        };
        let b = ObjectMeta {
            name: "b".to_owned(),
            labels: Some(BTreeMap::from([("k".to_owned(), "v".to_owned())])),
            ..ObjectMeta::default()
        };
        let diff = object_diff(&a, &b);
        assert!(diff.contains(&r#".name: "a" != "b""#.to_owned()), "{diff:?}");
        assert!(diff.iter().any(|l| l.starts_with(".labels: null")), "{diff:?}");
    }

    #[test]
    fn test_falls_back_to_debug_when_json_hides_difference() {
        let a = Time::from_unix(10, 0).unwrap();
        let b = Time::from_unix(10, 5).unwrap();
        let diff = object_diff(&a, &b);
        assert_eq!(diff.len(), 1);
        assert!(diff[0].starts_with("line 2:"), "{diff:?}");
    }

    #[test]
    fn test_long_diffs_are_truncated() {
        let a: Vec<i32> = (0..100).collect();
        let b: Vec<i32> = (1..101).collect();
        let diff = object_diff(&a, &b);
        assert_eq!(diff.len(), MAX_DIFF_LINES + 1);
        assert_eq!(diff.last().unwrap(), "... 36 more");
    }
}
