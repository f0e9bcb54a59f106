//! The round-trip invariant suite.
//!
//! [`round_trip`] runs nine checks in order for one object and one codec and
//! stops at the first failure:
//!
//! 1. a deep copy equals the original
//! 2. the copy encodes (an unsupported type ends the run cleanly)
//! 3. encoding left the copy unchanged
//! 4. a second encoding is byte-identical
//! 5. allocating decode equals the original
//! 6. decoding into a zero value succeeds
//! 7. for dual-representation types whose copy is untagged, the decoded
//!    tag is cleared
//! 8. the decoded-into value equals the copy
//! 9. the decoded-into value equals the original
//!
//! Each failure becomes an [`InvariantViolation`] carrying a structural
//! diff, and for checks that involve encoded bytes, those bytes.

use crate::catalog::Scheme;
use crate::codec::Codec;
use crate::diff::object_diff;
use crate::telemetry::{InvariantViolation, RoundTripStep};
use crate::Object;
use std::fmt;

/// Result of a round trip that found no violation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// All nine checks passed.
    Upheld,
    /// The codec cannot represent this type; nothing was checked past step 2.
    Unsupported {
        /// Why the codec declined.
        reason: String,
    },
}

impl Outcome {
    /// True if every check ran and passed.
    #[must_use]
    pub const fn is_upheld(&self) -> bool {
        matches!(self, Self::Upheld)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upheld => write!(f, "upheld"),
            Self::Unsupported { reason } => write!(f, "unsupported: {reason}"),
        }
    }
}

struct Check<'a, C> {
    codec: &'a C,
    type_name: &'static str,
}

impl<C: Codec> Check<'_, C> {
    fn violation(&self, step: RoundTripStep, message: impl Into<String>) -> Box<InvariantViolation> {
        Box::new(InvariantViolation::new(
            self.type_name,
            self.codec.name(),
            step,
            message,
        ))
    }

    fn equal<T: Object>(
        &self,
        step: RoundTripStep,
        message: &str,
        expected: &T,
        actual: &T,
        data: Option<&[u8]>,
    ) -> Result<(), Box<InvariantViolation>> {
        if expected == actual {
            return Ok(());
        }
        let mut violation = self.violation(step, message);
        violation.diff = object_diff(expected, actual);
        if let Some(data) = data {
            *violation = violation.with_encoded(data);
        }
        Err(violation)
    }
}

/// Runs the invariant suite for `original` through `codec`.
///
/// `scheme` tells the suite whether `T` has both an internal and an
/// external representation.
pub fn round_trip<T: Object, C: Codec>(
    codec: &C,
    scheme: &Scheme,
    original: &T,
) -> Result<Outcome, Box<InvariantViolation>> {
    let check = Check {
        codec,
        type_name: T::type_name(),
    };

    let copy = original.clone();
    check.equal(
        RoundTripStep::CopyFidelity,
        "deep copy differs from the original",
        original,
        &copy,
        None,
    )?;

    let data = match codec.encode(&copy) {
        Ok(data) => data,
        Err(e) if e.is_not_registered() => {
            tracing::debug!(type_name = check.type_name, codec = codec.name(), "{e}");
            return Ok(Outcome::Unsupported {
                reason: e.to_string(),
            });
        },
        Err(e) => {
            return Err(check.violation(RoundTripStep::Encode, format!("encode failed: {e}")));
        },
    };

    check.equal(
        RoundTripStep::EncodeMutatedCopy,
        "encoding modified the object",
        original,
        &copy,
        Some(&data),
    )?;

    let data2 = codec.encode(&copy).map_err(|e| {
        check.violation(
            RoundTripStep::StableEncoding,
            format!("second encode failed: {e}"),
        )
    })?;
    if data != data2 {
        let mut violation = check.violation(
            RoundTripStep::StableEncoding,
            "encoding the same object twice produced different bytes",
        );
        violation.diff = object_diff(&data_lines(&data), &data_lines(&data2));
        return Err(Box::new(violation.with_encoded(&data)));
    }

    let decoded: T = codec.decode(&data).map_err(|e| {
        Box::new(
            check
                .violation(RoundTripStep::Decode, format!("decode failed: {e}"))
                .with_encoded(&data),
        )
    })?;
    check.equal(
        RoundTripStep::DecodeEquality,
        "decoded object differs from the original",
        original,
        &decoded,
        Some(&data),
    )?;

    let mut decoded_into = T::default();
    codec.decode_into(&data, &mut decoded_into).map_err(|e| {
        Box::new(
            check
                .violation(RoundTripStep::DecodeInto, format!("decode into failed: {e}"))
                .with_encoded(&data),
        )
    })?;

    if scheme.is_internal_and_external::<T>() && copy.type_meta().api_version.is_empty() {
        decoded_into.type_meta_mut().clear();
    }

    check.equal(
        RoundTripStep::DecodeIntoEquality,
        "object decoded into a zero value differs from the copy",
        &copy,
        &decoded_into,
        Some(&data),
    )?;
    check.equal(
        RoundTripStep::CopyIsolation,
        "object decoded into a zero value differs from the original",
        original,
        &decoded_into,
        Some(&data),
    )?;

    Ok(Outcome::Upheld)
}

fn data_lines(data: &[u8]) -> Vec<String> {
    data.chunks(16).map(hex::encode).collect()
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
    use crate::codec::{BinaryCodec, CodecError, CodecResult, JsonCodec};
    use crate::model::{default_scheme, GetOptions, ObjectMeta, Service, Status, TypeMeta};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn scheme() -> Arc<Scheme> {
        Arc::new(default_scheme())
    }

    #[test]
    fn test_dual_kind_passes_both_codecs() {
        let scheme = scheme();
        let status = Status {
            status: "Failure".to_owned(),
            code: 500,
            ..Status::default()
        };
        let json = JsonCodec::new(scheme.clone());
        let binary = BinaryCodec::new(scheme.clone());
        assert_eq!(round_trip(&json, &scheme, &status).unwrap(), Outcome::Upheld);
        assert_eq!(round_trip(&binary, &scheme, &status).unwrap(), Outcome::Upheld);
    }

    #[test]
    fn test_external_only_kind_must_be_tagged() {
        let scheme = scheme();
        let json = JsonCodec::new(scheme.clone());
        let untagged = GetOptions::default();
        let err = round_trip(&json, &scheme, &untagged).unwrap_err();
        assert_eq!(err.step, RoundTripStep::DecodeEquality);

        let tagged = GetOptions {
            type_meta: TypeMeta::new("meta.k8s.io/v1", "GetOptions"),
            ..GetOptions::default()
        };
        assert!(round_trip(&json, &scheme, &tagged).unwrap().is_upheld());
    }

    #[test]
    fn test_unregistered_type_is_unsupported() {
        let empty = Arc::new(Scheme::new());
        let json = JsonCodec::new(empty.clone());
        let outcome = round_trip(&json, &empty, &Status::default()).unwrap();
        assert!(matches!(outcome, Outcome::Unsupported { .. }));
    }

    #[test]
    fn test_lossy_field_is_reported_with_diff() {
        let scheme = scheme();
        let json = JsonCodec::new(scheme.clone());
        let mut service = Service {
            type_meta: TypeMeta::new("serving.knative.dev/v1", "Service"),
            ..Service::default()
        };
        service.metadata = ObjectMeta {
            creation_timestamp: crate::model::Time::from_unix(1, 500).unwrap(),
            ..ObjectMeta::default()
        };
        let err = round_trip(&json, &scheme, &service).unwrap_err();
        assert_eq!(err.step, RoundTripStep::DecodeEquality);
        assert!(!err.diff.is_empty());
        assert!(err.encoded.as_deref().unwrap().starts_with('{'));
    }

    /// Appends a counter to every encoding.
    struct UnstableCodec {
        inner: JsonCodec,
        calls: AtomicUsize,
    }

    impl Codec for UnstableCodec {
        fn name(&self) -> &'static str {
            "unstable"
        }

        fn encode<T: Object>(&self, object: &T) -> CodecResult<Vec<u8>> {
            let mut data = self.inner.encode(object)?;
            data.push(b' ' + self.calls.fetch_add(1, Ordering::Relaxed) as u8);
            Ok(data)
        }

        fn decode<T: Object>(&self, data: &[u8]) -> CodecResult<T> {
            self.inner.decode(data)
        }

        fn decode_into<T: Object>(&self, data: &[u8], target: &mut T) -> CodecResult<()> {
            self.inner.decode_into(data, target)
        }
    }

    #[test]
    fn test_unstable_encoding_is_caught() {
        let scheme = scheme();
        let codec = UnstableCodec {
            inner: JsonCodec::new(scheme.clone()),
            calls: AtomicUsize::new(0),
        };
        let err = round_trip(&codec, &scheme, &Status::default()).unwrap_err();
        assert_eq!(err.step, RoundTripStep::StableEncoding);
        assert_eq!(err.codec, "unstable");
    }

    /// Fails every encode with a non-registration error.
    struct BrokenCodec;

    impl Codec for BrokenCodec {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn encode<T: Object>(&self, _object: &T) -> CodecResult<Vec<u8>> {
            Err(CodecError::encode("disk full", crate::codec::CodecOperation::Encode))
        }

        fn decode<T: Object>(&self, _data: &[u8]) -> CodecResult<T> {
            Ok(T::default())
        }

        fn decode_into<T: Object>(&self, _data: &[u8], _target: &mut T) -> CodecResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_unexpected_encode_error_is_fatal() {
        let scheme = scheme();
        let err = round_trip(&BrokenCodec, &scheme, &Status::default()).unwrap_err();
        assert_eq!(err.step, RoundTripStep::Encode);
        assert!(err.message.contains("disk full"));
    }
}
