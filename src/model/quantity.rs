//! Fixed-point resource quantities.

use crate::generate::{Fill, GenResult, Generator};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Smallest decimal exponent the textual form accepts.
pub const MIN_SCALE: i32 = -9;
/// Largest decimal exponent the textual form accepts.
pub const MAX_SCALE: i32 = 18;

/// A decimal quantity `value × 10^scale`.
///
/// The textual form is `"<value>"` or `"<value>e<scale>"`. Equality is
/// numeric: `10` and `1e1` compare equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quantity {
    value: i64,
    scale: i32,
}

/// Error parsing a [`Quantity`] from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseQuantityError {
    input: String,
    reason: String,
}

impl fmt::Display for ParseQuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid quantity {:?}: {}", self.input, self.reason)
    }
}

impl std::error::Error for ParseQuantityError {}

impl Quantity {
    /// Creates `value × 10^scale`.
    #[must_use]
    pub const fn new(value: i64, scale: i32) -> Self {
        Self { value, scale }
    }

    /// Creates a whole-number quantity.
    #[must_use]
    pub const fn from_int(value: i64) -> Self {
        Self { value, scale: 0 }
    }

    /// The unscaled value.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.value
    }

    /// The decimal exponent.
    #[must_use]
    pub const fn scale(&self) -> i32 {
        self.scale
    }

    fn normalized(self) -> (i64, i64) {
        if self.value == 0 {
            return (0, 0);
        }
        let mut value = self.value;
        let mut scale = i64::from(self.scale);
        while value % 10 == 0 {
            value /= 10;
            scale += 1;
        }
        (value, scale)
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Quantity {}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{}e{}", self.value, self.scale)
        }
    }
}

impl FromStr for Quantity {
    type Err = ParseQuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason: String| ParseQuantityError {
            input: s.to_owned(),
            reason,
        };
        let (value, scale) = s.split_once('e').unwrap_or((s, "0"));
        let value = value
            .parse::<i64>()
            .map_err(|e| fail(format!("mantissa: {e}")))?;
        let scale = scale
            .parse::<i32>()
            .map_err(|e| fail(format!("exponent: {e}")))?;
        if !(MIN_SCALE..=MAX_SCALE).contains(&scale) {
            return Err(fail(format!(
                "exponent {scale} outside {MIN_SCALE}..={MAX_SCALE}"
            )));
        }
        Ok(Self::new(value, scale))
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

impl Fill for Quantity {
    fn fill(&mut self, g: &mut Generator<'_, '_>) -> GenResult<()> {
        self.value = g.cursor().get_i64()?;
        self.scale = g.cursor().get_i32()?;
        Ok(())
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

    #[test]
    fn test_text_form() {
        assert_eq!(Quantity::from_int(250).to_string(), "250");
        assert_eq!(Quantity::new(-3, 2).to_string(), "-3e2");
        assert_eq!("-3e2".parse::<Quantity>().unwrap(), Quantity::new(-3, 2));
    }

    #[test]
    fn test_equality_is_numeric() {
        assert_eq!(Quantity::from_int(100), Quantity::new(1, 2));
        assert_eq!(Quantity::new(0, 5), Quantity::from_int(0));
        assert_ne!(Quantity::from_int(100), Quantity::from_int(10));
    }

    #[test]
    fn test_exponent_range_is_enforced() {
        assert!("1e19".parse::<Quantity>().is_err());
        assert!("1e-10".parse::<Quantity>().is_err());
        assert!("1e18".parse::<Quantity>().is_ok());
        assert!("abc".parse::<Quantity>().is_err());
    }

    #[test]
    fn test_out_of_range_scale_does_not_decode() {
        let q = Quantity::new(1, 40);
        let json = serde_json::to_string(&q).unwrap();
        assert!(serde_json::from_str::<Quantity>(&json).is_err());
    }
}
