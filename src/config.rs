//! Harness configuration.
//!
//! | Preset | Limits | Codecs |
//! |--------|--------|--------|
//! | `HarnessConfig::default()` | 10 items, 64-byte strings | json, binary |
//! | `HarnessConfig::quick()` | 4 items, 16-byte strings | json |
//! | `HarnessConfig::thorough()` | 32 items, 256-byte strings | json, binary |
//!
//! # Example
//!
//! ```
//! use schema_roundtrip::{CodecKind, HarnessConfig};
//!
//! let config = HarnessConfig {
//!     codecs: vec![CodecKind::Binary],
//!     ..HarnessConfig::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use crate::codec::CodecKind;
use crate::error::RoundTripError;
use crate::generate::GeneratorLimits;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

/// Accepted range for [`GeneratorLimits::max_collection_len`].
pub const COLLECTION_LEN_RANGE: RangeInclusive<usize> = 1..=64;
/// Accepted range for [`GeneratorLimits::max_string_len`].
pub const STRING_LEN_RANGE: RangeInclusive<usize> = 1..=4096;

/// Kinds excluded from selection by default. They are only ever read, never
/// written back, so their encodings are not expected to round-trip.
pub const DEFAULT_NON_ROUND_TRIPPABLE: [&str; 2] = ["GetOptions", "DeleteOptions"];

/// Settings for a [`Harness`](crate::Harness).
///
/// New fields may be added; construct with `..HarnessConfig::default()`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "HarnessConfig has no effect unless passed to HarnessBuilder::with_config()"]
pub struct HarnessConfig {
    /// Size bounds for generated values.
    ///
    /// Default: [`GeneratorLimits::default()`]
    pub limits: GeneratorLimits,

    /// Kind names never selected for verification.
    ///
    /// Default: `GetOptions`, `DeleteOptions`
    pub non_round_trippable: BTreeSet<String>,

    /// Codecs every instance is verified against, in order.
    ///
    /// Default: `[Json, Binary]`
    pub codecs: Vec<CodecKind>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            limits: GeneratorLimits::default(),
            non_round_trippable: DEFAULT_NON_ROUND_TRIPPABLE
                .iter()
                .map(|k| (*k).to_owned())
                .collect(),
            codecs: vec![CodecKind::Json, CodecKind::Binary],
        }
    }
}

impl HarnessConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Small values, textual codec only. Suited to smoke tests and
    /// benchmarks.
    pub fn quick() -> Self {
        Self {
            limits: GeneratorLimits {
                max_collection_len: 4,
                max_string_len: 16,
            },
            codecs: vec![CodecKind::Json],
            ..Self::default()
        }
    }

    /// Larger values through every codec.
    pub fn thorough() -> Self {
        Self {
            limits: GeneratorLimits {
                max_collection_len: 32,
                max_string_len: 256,
            },
            ..Self::default()
        }
    }

    /// Checks every field against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`RoundTripError::InvalidRequest`] naming the first field out
    /// of range, or if no codec is configured.
    pub fn validate(&self) -> Result<(), RoundTripError> {
        check_range(
            "max_collection_len",
            self.limits.max_collection_len,
            &COLLECTION_LEN_RANGE,
        )?;
        check_range(
            "max_string_len",
            self.limits.max_string_len,
            &STRING_LEN_RANGE,
        )?;
        if self.codecs.is_empty() {
            return Err(RoundTripError::InvalidRequest {
                info: "at least one codec must be configured".to_owned(),
            });
        }
        Ok(())
    }
}

fn check_range(
    field: &str,
    actual: usize,
    range: &RangeInclusive<usize>,
) -> Result<(), RoundTripError> {
    if range.contains(&actual) {
        return Ok(());
    }
    Err(RoundTripError::InvalidRequest {
        info: format!(
            "{field} must be in {}..={}, got {actual}",
            range.start(),
            range.end()
        ),
    })
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

    #[test]
    fn test_presets_are_valid() {
        HarnessConfig::default().validate().unwrap();
        HarnessConfig::quick().validate().unwrap();
        HarnessConfig::thorough().validate().unwrap();
    }

    #[test]
    fn test_default_excludes_read_only_options() {
        let config = HarnessConfig::new();
        assert!(config.non_round_trippable.contains("GetOptions"));
        assert!(config.non_round_trippable.contains("DeleteOptions"));
        assert_eq!(config.codecs, [CodecKind::Json, CodecKind::Binary]);
    }

    #[test]
    fn test_zero_collection_len_is_rejected() {
        let config = HarnessConfig {
            limits: GeneratorLimits {
                max_collection_len: 0,
                ..GeneratorLimits::default()
            },
            ..HarnessConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_collection_len"));
    }

    #[test]
    fn test_oversized_strings_are_rejected() {
        let config = HarnessConfig {
            limits: GeneratorLimits {
                max_string_len: 5000,
                ..GeneratorLimits::default()
            },
            ..HarnessConfig::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("5000"));
    }

    #[test]
    fn test_empty_codec_list_is_rejected() {
        let config = HarnessConfig {
            codecs: Vec::new(),
            ..HarnessConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RoundTripError::InvalidRequest { .. })
        ));
    }
}
