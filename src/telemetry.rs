//! Structured reports for round-trip invariant violations.
//!
//! A failed check produces an [`InvariantViolation`]: which type, which
//! codec, which of the nine steps, a structural diff and (for encoding
//! checks) a rendering of the encoded bytes. Violations are plain data that
//! can be:
//!
//! - Logged via tracing (the default)
//! - Kept in memory by a test and inspected afterwards
//! - Sent to custom observers
//!
//! # Example
//!
//! ```
//! use schema_roundtrip::telemetry::{
//!     CollectingObserver, InvariantViolation, RoundTripStep, ViolationObserver,
//! };
//!
//! let observer = CollectingObserver::new();
//! observer.on_violation(&InvariantViolation::new(
//!     "Status",
//!     "json",
//!     RoundTripStep::StableEncoding,
//!     "encodings differ",
//! ));
//! assert!(observer.has_violation(RoundTripStep::StableEncoding));
//! ```

use crate::codec::data_as_string;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The nine checks of a round trip, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundTripStep {
    /// A deep copy equals its source.
    CopyFidelity,
    /// The first encode failed for a reason other than an unsupported type.
    Encode,
    /// Encoding changed the object it was given.
    EncodeMutatedCopy,
    /// Two encodings of the same object differ.
    StableEncoding,
    /// Allocating decode failed.
    Decode,
    /// Allocating decode does not equal the source.
    DecodeEquality,
    /// Decoding into an existing object failed.
    DecodeInto,
    /// Decode-into does not equal the copy.
    DecodeIntoEquality,
    /// Decode-into does not equal the source.
    CopyIsolation,
}

impl RoundTripStep {
    /// Returns the string representation of this step.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CopyFidelity => "copy_fidelity",
            Self::Encode => "encode",
            Self::EncodeMutatedCopy => "encode_mutated_copy",
            Self::StableEncoding => "stable_encoding",
            Self::Decode => "decode",
            Self::DecodeEquality => "decode_equality",
            Self::DecodeInto => "decode_into",
            Self::DecodeIntoEquality => "decode_into_equality",
            Self::CopyIsolation => "copy_isolation",
        }
    }
}

impl std::fmt::Display for RoundTripStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failed round-trip check, serializable for crash reports.
///
/// # Example
///
/// ```
/// use schema_roundtrip::telemetry::{InvariantViolation, RoundTripStep};
///
/// let violation = InvariantViolation::new("Table", "binary", RoundTripStep::Decode, "bad tag")
///     .with_kind("meta.k8s.io/v1, Kind=Table")
///     .with_context("len", "42");
///
/// let json = violation.to_json().unwrap();
/// assert!(json.contains(r#""step":"decode""#));
/// assert!(json.contains(r#""codec":"binary""#));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct InvariantViolation {
    /// Name of the type under test.
    pub type_name: &'static str,
    /// The selected kind, if known.
    pub kind: Option<String>,
    /// Codec that was running.
    pub codec: &'static str,
    /// The failed check.
    pub step: RoundTripStep,
    /// Human-readable description.
    pub message: String,
    /// Structural diff of the two compared values, one entry per difference.
    pub diff: Vec<String>,
    /// The encoded bytes, as text or a hex dump.
    pub encoded: Option<String>,
    /// Free-form key/value notes, sorted by key.
    pub context: BTreeMap<String, String>,
}

impl InvariantViolation {
    /// A violation with no kind, diff, bytes or notes yet.
    #[must_use]
    pub fn new(
        type_name: &'static str,
        codec: &'static str,
        step: RoundTripStep,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_name,
            kind: None,
            codec,
            step,
            message: message.into(),
            diff: Vec::new(),
            encoded: None,
            context: BTreeMap::new(),
        }
    }

    /// Records the selected kind.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Attaches a structural diff.
    #[must_use]
    pub fn with_diff(mut self, diff: Vec<String>) -> Self {
        self.diff = diff;
        self
    }

    /// Attaches encoded bytes, rendered by [`data_as_string`].
    #[must_use]
    pub fn with_encoded(mut self, data: &[u8]) -> Self {
        self.encoded = Some(data_as_string(data));
        self
    }

    /// Adds one note; a repeated key overwrites the earlier value.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Compact JSON form, one line per violation.
    #[must_use]
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    /// Indented JSON form, for panic messages and crash reports.
    #[must_use]
    pub fn to_json_pretty(&self) -> Option<String> {
        serde_json::to_string_pretty(self).ok()
    }
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.step, self.type_name)?;
        if let Some(kind) = &self.kind {
            write!(f, " ({kind})")?;
        }
        write!(f, " via {}: {}", self.codec, self.message)?;
        for line in &self.diff {
            write!(f, "\n  {line}")?;
        }
        if let Some(encoded) = &self.encoded {
            write!(f, "\nEncoded: {encoded}")?;
        }
        Ok(())
    }
}

/// Receives every violation a harness finds.
///
/// `Send + Sync` because a single harness is shared by fuzzing threads.
///
/// # Example
///
/// ```
/// use schema_roundtrip::telemetry::{InvariantViolation, ViolationObserver};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct CountingObserver {
///     seen: AtomicUsize,
/// }
///
/// impl ViolationObserver for CountingObserver {
///     fn on_violation(&self, _violation: &InvariantViolation) {
///         self.seen.fetch_add(1, Ordering::Relaxed);
///     }
/// }
/// ```
pub trait ViolationObserver: Send + Sync {
    /// Handles one violation.
    fn on_violation(&self, violation: &InvariantViolation);
}

/// Logs violations through `tracing`. Used when a harness has no observer.
///
/// One `error` event carries step, type, kind and codec as fields; the diff
/// and the encoded bytes follow as `debug` events.
#[derive(Debug, Default, Clone)]
pub struct TracingObserver;

impl TracingObserver {
    /// A tracing observer; it has no state.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ViolationObserver for TracingObserver {
    fn on_violation(&self, violation: &InvariantViolation) {
        let step = violation.step.as_str();
        let type_name = violation.type_name;
        let kind = violation.kind.as_deref().unwrap_or("unknown");
        let codec = violation.codec;
        tracing::error!(
            step,
            type_name,
            kind,
            codec,
            diff_len = violation.diff.len(),
            "{}",
            violation.message
        );
        if !violation.diff.is_empty() {
            tracing::debug!(step, type_name, "diff:\n{}", violation.diff.join("\n"));
        }
        if let Some(encoded) = &violation.encoded {
            tracing::debug!(step, type_name, "encoded: {}", encoded);
        }
    }
}

/// Keeps every violation in memory so tests can inspect them afterwards.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    seen: Mutex<Vec<InvariantViolation>>,
}

impl CollectingObserver {
    /// An empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far, oldest first.
    #[must_use]
    pub fn violations(&self) -> Vec<InvariantViolation> {
        self.seen.lock().clone()
    }

    /// Number of violations held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    /// True until the first violation arrives.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }

    /// Whether any reported violation failed at `step`.
    #[must_use]
    pub fn has_violation(&self, step: RoundTripStep) -> bool {
        self.seen.lock().iter().any(|v| v.step == step)
    }

    /// Violations raised while `codec` was running.
    #[must_use]
    pub fn violations_for_codec(&self, codec: &str) -> Vec<InvariantViolation> {
        let seen = self.seen.lock();
        seen.iter().filter(|v| v.codec == codec).cloned().collect()
    }

    /// Removes and returns everything reported so far.
    pub fn take(&self) -> Vec<InvariantViolation> {
        std::mem::take(&mut *self.seen.lock())
    }
}

impl ViolationObserver for CollectingObserver {
    fn on_violation(&self, violation: &InvariantViolation) {
        self.seen.lock().push(violation.clone());
    }
}

/// Fans one violation out to several observers, in insertion order.
#[derive(Default)]
pub struct CompositeObserver {
    targets: Vec<Arc<dyn ViolationObserver>>,
}

impl CompositeObserver {
    /// A composite with no targets; reports go nowhere.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `observer` and returns `self` for chaining.
    #[must_use]
    pub fn with(mut self, observer: Arc<dyn ViolationObserver>) -> Self {
        self.targets.push(observer);
        self
    }

    /// Appends `observer` in place.
    pub fn add(&mut self, observer: Arc<dyn ViolationObserver>) {
        self.targets.push(observer);
    }
}

impl FromIterator<Arc<dyn ViolationObserver>> for CompositeObserver {
    fn from_iter<I: IntoIterator<Item = Arc<dyn ViolationObserver>>>(iter: I) -> Self {
        Self {
            targets: iter.into_iter().collect(),
        }
    }
}

impl ViolationObserver for CompositeObserver {
    fn on_violation(&self, violation: &InvariantViolation) {
        self.targets.iter().for_each(|t| t.on_violation(violation));
    }
}

impl std::fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("targets", &self.targets.len())
            .finish()
    }
}

/// Hands `violation` to `observer`, or logs it with [`TracingObserver`]
/// when there is none.
pub fn report_to_observer<O: ViolationObserver + ?Sized>(
    observer: Option<&Arc<O>>,
    violation: &InvariantViolation,
) {
    if let Some(observer) = observer {
        observer.on_violation(violation);
    } else {
        TracingObserver.on_violation(violation);
    }
}

/// Fails the test if `$observer` collected anything, listing each violation
/// in its `Display` form.
///
/// # Panics
///
/// When at least one violation was reported.
#[macro_export]
macro_rules! assert_no_violations {
    ($observer:expr) => {{
        let reported = $observer.violations();
        if !reported.is_empty() {
            let listing: Vec<String> = reported.iter().map(ToString::to_string).collect();
            panic!(
                "{} round-trip violation(s) reported:\n{}",
                reported.len(),
                listing.join("\n")
            );
        }
    }};
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

    fn sample() -> InvariantViolation {
        InvariantViolation::new(
            "Status",
            "json",
            RoundTripStep::DecodeEquality,
            "decoded object differs",
        )
        .with_kind("meta.k8s.io/v1, Kind=Status")
        .with_diff(vec!["code: 1 != 2".to_owned()])
        .with_encoded(b"{\"code\":1}\n")
    }

    #[test]
    fn test_display_includes_step_codec_and_diff() {
        let text = sample().to_string();
        assert!(text.starts_with("[decode_equality] Status (meta.k8s.io/v1, Kind=Status) via json"));
        assert!(text.contains("code: 1 != 2"));
        assert!(text.contains("Encoded: {\"code\":1}"));
    }

    #[test]
    fn test_to_json_fields() {
        let json = sample().to_json().unwrap();
        assert!(json.contains(r#""step":"decode_equality""#));
        assert!(json.contains(r#""type_name":"Status""#));
        assert!(sample().to_json_pretty().unwrap().contains('\n'));
    }

    #[test]
    fn test_collector_filters_by_step_and_codec() {
        let observer = CollectingObserver::new();
        assert!(observer.is_empty());
        observer.on_violation(&sample());
        observer.on_violation(&InvariantViolation::new(
            "Table",
            "binary",
            RoundTripStep::StableEncoding,
            "differs",
        ));
        assert_eq!(observer.len(), 2);
        assert!(observer.has_violation(RoundTripStep::StableEncoding));
        assert!(!observer.has_violation(RoundTripStep::CopyIsolation));
        assert_eq!(observer.violations_for_codec("json").len(), 1);
        let taken = observer.take();
        assert_eq!(taken[1].type_name, "Table");
        assert_no_violations!(observer);
    }

    #[test]
    #[should_panic(expected = "1 round-trip violation(s) reported")]
    fn test_assert_no_violations_lists_what_was_reported() {
        let observer = CollectingObserver::new();
        observer.on_violation(&sample());
        assert_no_violations!(observer);
    }

    #[test]
    fn test_composite_reaches_every_target() {
        let first = Arc::new(CollectingObserver::new());
        let second = Arc::new(CollectingObserver::new());
        let mut composite: CompositeObserver =
            [first.clone() as Arc<dyn ViolationObserver>].into_iter().collect();
        composite.add(second.clone());
        let composite = composite.with(first.clone());
        composite.on_violation(&sample());
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_missing_observer_logs_instead() {
        let observer = Arc::new(CollectingObserver::new());
        report_to_observer(Some(&observer), &sample());
        assert_eq!(observer.len(), 1);
        report_to_observer(None::<&Arc<CollectingObserver>>, &sample());
        assert_eq!(observer.len(), 1);
    }

    #[test]
    fn test_steps_are_ordered() {
        assert!(RoundTripStep::CopyFidelity < RoundTripStep::CopyIsolation);
        assert_eq!(RoundTripStep::DecodeInto.to_string(), "decode_into");
    }
}
