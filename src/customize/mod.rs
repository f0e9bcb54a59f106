//! Per-type generation overrides.
//!
//! A [`Customizers`] registry maps a type to a function that takes full
//! control of generating values of that type. The registry is built once at
//! setup and shared read-only afterwards; [`Generator::generate`] looks it up
//! for every value it populates.
//!
//! [`Customizers::with_defaults`] installs the built-in set, which keeps
//! generated objects inside what the codecs can represent faithfully:
//!
//! - [`meta`]: timestamps, type tags, object and list metadata, label
//!   selectors
//! - [`runtime`]: quantities, embedded objects, raw extensions
//! - [`table`]: table options and table rows
//! - [`serving`]: URLs and service status conditions

pub mod meta;
pub mod runtime;
pub mod serving;
pub mod table;

pub use serving::fuzz_conditions;

use crate::codec::JsonCodec;
use crate::generate::{Fill, GenError, GenResult, Generator};
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;

/// A type-erased customizer. The target is always the registered type.
pub type Customizer =
    Box<dyn Fn(&mut dyn Any, &mut Generator<'_, '_>) -> GenResult<()> + Send + Sync>;

struct Entry {
    type_name: &'static str,
    customize: Customizer,
}

/// Registry of generation overrides keyed by type.
#[derive(Default)]
pub struct Customizers {
    by_type: BTreeMap<TypeId, Entry>,
}

impl fmt::Debug for Customizers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.by_type.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        f.debug_struct("Customizers").field("types", &names).finish()
    }
}

impl Customizers {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in customizers.
    ///
    /// `reference` encodes the objects placed inside raw extensions.
    #[must_use]
    pub fn with_defaults(reference: JsonCodec) -> Self {
        let mut customizers = Self::new();
        meta::register(&mut customizers);
        runtime::register(&mut customizers, reference);
        table::register(&mut customizers);
        serving::register(&mut customizers);
        customizers
    }

    /// Registers `customize` for `T`, replacing any earlier registration.
    pub fn register<T, F>(&mut self, customize: F)
    where
        T: Fill,
        F: Fn(&mut T, &mut Generator<'_, '_>) -> GenResult<()> + Send + Sync + 'static,
    {
        let erased: Customizer = Box::new(move |target: &mut dyn Any, g: &mut Generator<'_, '_>| {
            match target.downcast_mut::<T>() {
                Some(target) => customize(target, g),
                None => Err(GenError::MisKeyed {
                    registered: std::any::type_name::<T>(),
                }),
            }
        });
        self.by_type.insert(
            TypeId::of::<T>(),
            Entry {
                type_name: std::any::type_name::<T>(),
                customize: erased,
            },
        );
    }

    /// Moves every entry of `other` into `self`. Entries of `other` win.
    pub fn extend(&mut self, other: Self) {
        self.by_type.extend(other.by_type);
    }

    /// The customizer for `type_id`, if any.
    #[must_use]
    pub fn get(&self, type_id: TypeId) -> Option<&Customizer> {
        self.by_type.get(&type_id).map(|entry| &entry.customize)
    }

    /// True if a customizer is registered for `T`.
    #[must_use]
    pub fn contains<T: Fill>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Customizers;
    use crate::codec::JsonCodec;
    use crate::generate::{Fill, GenResult, Generator, GeneratorLimits};
    use crate::model::default_scheme;
    use std::sync::Arc;

    pub fn defaults() -> Customizers {
        Customizers::with_defaults(JsonCodec::new(Arc::new(default_scheme())))
    }

    pub fn bytes(seed: u32) -> Vec<u8> {
        (0..4096u32)
            .map(|i| (i.wrapping_mul(2_654_435_761).wrapping_add(seed) >> 13) as u8)
            .collect()
    }

    pub fn generate<T: Fill + Default>(customizers: &Customizers, data: &[u8]) -> GenResult<T> {
        let mut g = Generator::new(data, customizers, GeneratorLimits::default());
        let mut value = T::default();
        g.generate(&mut value)?;
        Ok(value)
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
    use super::test_support::defaults;
    use super::*;
    use crate::model::{
        EmbeddedObject, LabelSelector, ListMeta, ObjectMeta, Quantity, RawExtension, Time,
        TypeMeta, Url,
    };

    #[test]
    fn test_defaults_cover_constrained_types() {
        let customizers = defaults();
        assert!(customizers.contains::<Time>());
        assert!(customizers.contains::<TypeMeta>());
        assert!(customizers.contains::<ObjectMeta>());
        assert!(customizers.contains::<ListMeta>());
        assert!(customizers.contains::<LabelSelector>());
        assert!(customizers.contains::<Quantity>());
        assert!(customizers.contains::<EmbeddedObject>());
        assert!(customizers.contains::<RawExtension>());
        assert!(customizers.contains::<Url>());
        assert!(!customizers.contains::<String>());
    }

    #[test]
    fn test_register_replaces() {
        let mut customizers = Customizers::new();
        customizers.register::<bool, _>(|b, _| {
            *b = true;
            Ok(())
        });
        customizers.register::<bool, _>(|b, _| {
            *b = false;
            Ok(())
        });
        assert_eq!(customizers.len(), 1);
        let value: bool = test_support::generate(&customizers, &[1]).unwrap();
        assert!(!value);
    }

    #[test]
    fn test_extend_overrides_defaults() {
        let mut customizers = defaults();
        let before = customizers.len();
        let mut extra = Customizers::new();
        extra.register::<Time, _>(|t, _| {
            *t = Time::default();
            Ok(())
        });
        extra.register::<String, _>(|s, _| {
            s.clear();
            Ok(())
        });
        customizers.extend(extra);
        assert_eq!(customizers.len(), before + 1);
        let t: Time = test_support::generate(&customizers, &[0xFF; 8]).unwrap();
        assert_eq!(t, Time::default());
    }

    #[test]
    fn test_mis_keyed_entry_is_reported() {
        let mut customizers = Customizers::new();
        customizers.register::<u32, _>(|n, _| {
            *n = 7;
            Ok(())
        });
        let customize = customizers.get(TypeId::of::<u32>()).unwrap();
        let lookup = Customizers::new();
        let mut g = Generator::new(&[0; 8], &lookup, crate::generate::GeneratorLimits::default());
        let mut wrong = 0u16;
        let err = customize(&mut wrong as &mut dyn Any, &mut g).unwrap_err();
        assert_eq!(err, GenError::MisKeyed { registered: "u32" });
        assert_eq!(wrong, 0);
        assert!(err.to_string().contains("u32"));
    }

    #[test]
    fn test_debug_lists_type_names() {
        let mut customizers = Customizers::new();
        customizers.register::<u32, _>(|_, _| Ok(()));
        assert!(format!("{customizers:?}").contains("u32"));
    }
}
