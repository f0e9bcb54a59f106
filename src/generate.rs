//! Structural value generation driven by a [`Cursor`].
//!
//! Every generatable type implements [`Fill`], which populates a value in
//! place field by field. [`Generator::generate`] is the single dispatch
//! point: it consults the [`Customizers`] registry first and only falls back
//! to the type's own [`Fill`] implementation when no override is registered.
//! Customizers call [`Generator::generate_default`] to get the structural
//! behaviour for the outer value while still having nested fields
//! customized.
//!
//! Collections draw their length from the cursor, bounded by
//! [`GeneratorLimits`], so a single iteration stays small.

use crate::codec::CodecError;
use crate::cursor::{Cursor, Exhausted};
use crate::customize::Customizers;
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;

/// Why generation of an instance stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenError {
    /// The input ran out. The iteration should be skipped.
    Exhausted(Exhausted),
    /// A reference codec used inside a customizer failed.
    Codec(CodecError),
    /// A customizer was handed a value of a type it was not registered for.
    MisKeyed {
        /// Type the customizer was registered for.
        registered: &'static str,
    },
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted(e) => write!(f, "{e}"),
            Self::Codec(e) => write!(f, "reference codec failed during generation: {e}"),
            Self::MisKeyed { registered } => {
                write!(f, "customizer for {registered} received a value of another type")
            },
        }
    }
}

impl std::error::Error for GenError {}

impl From<Exhausted> for GenError {
    fn from(e: Exhausted) -> Self {
        Self::Exhausted(e)
    }
}

impl From<CodecError> for GenError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

/// Result type for generation.
pub type GenResult<T> = Result<T, GenError>;

/// Size bounds applied by default generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorLimits {
    /// Upper bound for sequence and map lengths.
    ///
    /// Default: 10
    pub max_collection_len: usize,
    /// Upper bound (in input bytes) for free-form strings.
    ///
    /// Default: 64
    pub max_string_len: usize,
}

impl Default for GeneratorLimits {
    fn default() -> Self {
        Self {
            max_collection_len: 10,
            max_string_len: 64,
        }
    }
}

/// Types that can be populated from fuzz input.
pub trait Fill: Any {
    /// Overwrites `self` using bytes from the generator's cursor.
    fn fill(&mut self, g: &mut Generator<'_, '_>) -> GenResult<()>;
}

/// One generation pass over one input buffer.
///
/// A generator owns its cursor exclusively; it is created per iteration and
/// dropped once the instance is populated.
pub struct Generator<'a, 'c> {
    cursor: Cursor<'a>,
    customizers: &'c Customizers,
    limits: GeneratorLimits,
}

impl fmt::Debug for Generator<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("cursor", &self.cursor)
            .field("customizers", &self.customizers.len())
            .field("limits", &self.limits)
            .finish()
    }
}

impl<'a, 'c> Generator<'a, 'c> {
    /// Creates a generator over `data`.
    #[must_use]
    pub fn new(data: &'a [u8], customizers: &'c Customizers, limits: GeneratorLimits) -> Self {
        Self {
            cursor: Cursor::new(data),
            customizers,
            limits,
        }
    }

    /// Direct access to the underlying cursor for primitive reads.
    pub fn cursor(&mut self) -> &mut Cursor<'a> {
        &mut self.cursor
    }

    /// The limits this generator was created with.
    #[must_use]
    pub const fn limits(&self) -> GeneratorLimits {
        self.limits
    }

    /// Populates `target`, honoring any customizer registered for `T`.
    pub fn generate<T: Fill>(&mut self, target: &mut T) -> GenResult<()> {
        let customizers = self.customizers;
        match customizers.get(TypeId::of::<T>()) {
            Some(customize) => customize(target as &mut dyn Any, self),
            None => target.fill(self),
        }
    }

    /// Populates `target` with its structural [`Fill`] even if a customizer
    /// for `T` exists. Nested fields still go through [`Self::generate`].
    pub fn generate_default<T: Fill>(&mut self, target: &mut T) -> GenResult<()> {
        target.fill(self)
    }

    /// Draws a collection length in `0..=max_collection_len`.
    pub fn collection_len(&mut self) -> GenResult<usize> {
        Ok(self.cursor.get_len(self.limits.max_collection_len)?)
    }
}

/// Implements [`Fill`] for a struct by generating the listed fields in
/// order. Fields that are not listed keep their current value.
///
/// ```
/// use schema_roundtrip::impl_fill;
///
/// #[derive(Default)]
/// struct Pair {
///     left: i32,
///     right: String,
///     cached: u64,
/// }
///
/// impl_fill!(Pair { left, right });
/// ```
#[macro_export]
macro_rules! impl_fill {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::generate::Fill for $ty {
            fn fill(
                &mut self,
                g: &mut $crate::generate::Generator<'_, '_>,
            ) -> $crate::generate::GenResult<()> {
                $( g.generate(&mut self.$field)?; )*
                let _ = g;
                Ok(())
            }
        }
    };
}

impl Fill for bool {
    fn fill(&mut self, g: &mut Generator<'_, '_>) -> GenResult<()> {
        *self = g.cursor().get_bool()?;
        Ok(())
    }
}

impl Fill for u8 {
    fn fill(&mut self, g: &mut Generator<'_, '_>) -> GenResult<()> {
        *self = g.cursor().take(1)?[0];
        Ok(())
    }
}

impl Fill for i32 {
    fn fill(&mut self, g: &mut Generator<'_, '_>) -> GenResult<()> {
        *self = g.cursor().get_i32()?;
        Ok(())
    }
}

impl Fill for i64 {
    fn fill(&mut self, g: &mut Generator<'_, '_>) -> GenResult<()> {
        *self = g.cursor().get_i64()?;
        Ok(())
    }
}

impl Fill for u32 {
    fn fill(&mut self, g: &mut Generator<'_, '_>) -> GenResult<()> {
        *self = g.cursor().get_u32()?;
        Ok(())
    }
}

impl Fill for u64 {
    fn fill(&mut self, g: &mut Generator<'_, '_>) -> GenResult<()> {
        *self = g.cursor().get_u64()?;
        Ok(())
    }
}

impl Fill for String {
    fn fill(&mut self, g: &mut Generator<'_, '_>) -> GenResult<()> {
        let max = g.limits().max_string_len;
        *self = g.cursor().get_string(max)?;
        Ok(())
    }
}

impl<T: Fill + Default> Fill for Option<T> {
    fn fill(&mut self, g: &mut Generator<'_, '_>) -> GenResult<()> {
        if g.cursor().get_bool()? {
            let mut value = T::default();
            g.generate(&mut value)?;
            *self = Some(value);
        } else {
            *self = None;
        }
        Ok(())
    }
}

impl<T: Fill + Default> Fill for Vec<T> {
    fn fill(&mut self, g: &mut Generator<'_, '_>) -> GenResult<()> {
        let len = g.collection_len()?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            let mut item = T::default();
            g.generate(&mut item)?;
            items.push(item);
        }
        *self = items;
        Ok(())
    }
}

impl<T: Fill + Default> Fill for BTreeMap<String, T> {
    fn fill(&mut self, g: &mut Generator<'_, '_>) -> GenResult<()> {
        let len = g.collection_len()?;
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let mut key = String::new();
            g.generate(&mut key)?;
            let mut value = T::default();
            g.generate(&mut value)?;
            map.insert(key, value);
        }
        *self = map;
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

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Sample {
        flag: bool,
        count: i32,
        name: String,
        tags: Vec<String>,
        extra: Option<u64>,
        skipped: u64,
    }

    impl_fill!(Sample {
        flag,
        count,
        name,
        tags,
        extra
    });

    fn generate_sample(data: &[u8], customizers: &Customizers) -> GenResult<Sample> {
        let mut g = Generator::new(data, customizers, GeneratorLimits::default());
        let mut sample = Sample::default();
        g.generate(&mut sample)?;
        Ok(sample)
    }

    fn input() -> Vec<u8> {
        (0..512u32).map(|i| (i.wrapping_mul(31) % 251) as u8).collect()
    }

    #[test]
    fn test_generation_is_deterministic() {
        let customizers = Customizers::new();
        let a = generate_sample(&input(), &customizers).unwrap();
        let b = generate_sample(&input(), &customizers).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.skipped, 0);
    }

    #[test]
    fn test_exhaustion_propagates() {
        let customizers = Customizers::new();
        let err = generate_sample(&[1, 2], &customizers).unwrap_err();
        assert!(matches!(err, GenError::Exhausted(_)));
    }

    #[test]
    fn test_collections_respect_limit() {
        let customizers = Customizers::new();
        let limits = GeneratorLimits {
            max_collection_len: 3,
            max_string_len: 4,
        };
        let data = vec![0xFF; 256];
        let mut g = Generator::new(&data, &customizers, limits);
        let mut v: Vec<String> = Vec::new();
        g.generate(&mut v).unwrap();
        assert!(v.len() <= 3);
        assert!(v.iter().all(|s| s.chars().count() <= 4));
    }

    #[test]
    fn test_customizer_overrides_default() {
        let mut customizers = Customizers::new();
        customizers.register::<String, _>(|s, g| {
            g.cursor().get_int()?;
            *s = "fixed".to_owned();
            Ok(())
        });
        let sample = generate_sample(&input(), &customizers).unwrap();
        assert_eq!(sample.name, "fixed");
        assert!(sample.tags.iter().all(|t| t == "fixed"));
    }

    #[test]
    fn test_generate_default_bypasses_outer_customizer() {
        let mut customizers = Customizers::new();
        customizers.register::<i32, _>(|v, _| {
            *v = 7;
            Ok(())
        });
        let data = input();
        let mut g = Generator::new(&data, &customizers, GeneratorLimits::default());
        let mut value = 0i32;
        g.generate_default(&mut value).unwrap();
        assert_eq!(value, i32::from_le_bytes([data[0], data[1], data[2], data[3]]));

        let mut customized = 0i32;
        g.generate(&mut customized).unwrap();
        assert_eq!(customized, 7);
    }
}
