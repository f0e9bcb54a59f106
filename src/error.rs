use std::error::Error;
use std::fmt;
use std::fmt::Display;

use crate::cursor::Exhausted;
use crate::generate::GenError;
use crate::telemetry::InvariantViolation;

/// Everything a verification call can return besides a report.
///
/// Only [`RoundTripError::Exhausted`] is recoverable: the fuzz iteration is
/// skipped. Every other variant means the caller or a codec is broken.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundTripError {
    /// The fuzz input ran out before the instance was fully generated.
    Exhausted(Exhausted),
    /// You made an invalid request, usually by using wrong parameters for function calls.
    InvalidRequest {
        /// Further specifies why the request was invalid.
        info: String,
    },
    /// A customizer failed for a reason other than exhaustion.
    Generation {
        /// Type being generated.
        type_name: &'static str,
        /// What went wrong.
        context: String,
    },
    /// A round-trip invariant did not hold.
    Violation(Box<InvariantViolation>),
}

impl RoundTripError {
    /// True if the iteration should simply be skipped.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }

    /// The violation report, if this is one.
    #[must_use]
    pub fn violation(&self) -> Option<&InvariantViolation> {
        match self {
            Self::Violation(v) => Some(v),
            _ => None,
        }
    }

    /// Attributes a generation failure to `type_name`.
    #[must_use]
    pub fn from_generation(type_name: &'static str, err: GenError) -> Self {
        match err {
            GenError::Exhausted(e) => Self::Exhausted(e),
            e @ (GenError::Codec(_) | GenError::MisKeyed { .. }) => Self::Generation {
                type_name,
                context: e.to_string(),
            },
        }
    }
}

impl Display for RoundTripError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted(e) => write!(f, "{e}"),
            Self::InvalidRequest { info } => write!(f, "Invalid Request: {info}"),
            Self::Generation { type_name, context } => {
                write!(f, "Generating {type_name} failed: {context}")
            },
            Self::Violation(v) => write!(f, "{v}"),
        }
    }
}

impl Error for RoundTripError {}

impl From<Exhausted> for RoundTripError {
    fn from(e: Exhausted) -> Self {
        Self::Exhausted(e)
    }
}

impl From<Box<InvariantViolation>> for RoundTripError {
    fn from(v: Box<InvariantViolation>) -> Self {
        Self::Violation(v)
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
    use crate::codec::{CodecError, CodecOperation};

    #[test]
    fn test_only_exhaustion_is_recoverable() {
        let exhausted = RoundTripError::Exhausted(Exhausted {
            requested: 1,
            remaining: 0,
        });
        assert!(exhausted.is_recoverable());
        let invalid = RoundTripError::InvalidRequest {
            info: "empty catalog".to_owned(),
        };
        assert!(!invalid.is_recoverable());
        assert!(invalid.to_string().contains("empty catalog"));
    }

    #[test]
    fn test_from_generation_keeps_exhaustion() {
        let e = Exhausted {
            requested: 8,
            remaining: 2,
        };
        let err = RoundTripError::from_generation("Status", GenError::Exhausted(e));
        assert_eq!(err, RoundTripError::Exhausted(e));

        let codec = CodecError::encode("bad", CodecOperation::Encode);
        let err = RoundTripError::from_generation("Status", GenError::Codec(codec));
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("Status"));

        let err = RoundTripError::from_generation("Table", GenError::MisKeyed { registered: "u32" });
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("u32"));
    }
}
