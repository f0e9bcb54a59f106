//! # Schema Roundtrip
//!
//! Fuzz-driven round-trip verification for serializable objects registered
//! in a type catalog.
//!
//! Given raw fuzz bytes, the harness selects one registered kind, builds a
//! deterministic instance of it by consuming the bytes, and checks that every
//! configured codec survives a nine-step encode/decode round trip: stable
//! encoding, no mutation of the input, and equality after decoding into a
//! fresh or an existing value.
//!
//! ```
//! use schema_roundtrip::{Harness, RoundTripError};
//!
//! let harness = Harness::new()?;
//! let data = vec![0x5a_u8; 4096];
//! match harness.verify(&data, 0) {
//!     Ok(report) => assert!(report.is_fully_upheld()),
//!     Err(e) if e.is_recoverable() => {}, // not enough input, skip
//!     Err(e) => panic!("{e}"),
//! }
//! # Ok::<(), RoundTripError>(())
//! ```
//!
//! # Layout
//!
//! - [`cursor`] and [`generate`]: byte-consuming value generation
//! - [`customize`]: per-type overrides that keep generated values faithful
//! - [`catalog`]: kinds, their backing types and selection
//! - [`codec`]: the textual and binary codecs under test
//! - [`verifier`]: the round-trip checks for one instance and one codec
//! - [`harness`]: selection, generation and verification wired together
//! - [`model`]: the built-in object family

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};

pub use catalog::{GroupVersionKind, KindEntry, Scheme, INTERNAL_VERSION};
pub use codec::{BinaryCodec, Codec, CodecError, CodecHandle, CodecKind, JsonCodec};
pub use config::HarnessConfig;
pub use customize::Customizers;
pub use error::RoundTripError;
pub use generate::{Fill, GenError, GenResult, Generator, GeneratorLimits};
pub use harness::{CodecOutcome, FuzzInput, Harness, HarnessBuilder, Report};
pub use model::{default_scheme, TypeMeta};
pub use telemetry::{
    CollectingObserver, CompositeObserver, InvariantViolation, RoundTripStep, TracingObserver,
    ViolationObserver,
};
pub use verifier::{round_trip, Outcome};

pub mod catalog;
pub mod codec;
pub mod config;
pub mod cursor;
pub mod customize;
pub mod diff;
#[doc(hidden)]
pub mod error;
pub mod escape;
pub mod generate;
pub mod harness;
pub mod label;
pub mod model;
pub mod telemetry;
pub mod verifier;

/// A registered, serializable value that carries an in-band type tag.
///
/// Implement it with [`impl_object!`] for structs with a `type_meta: TypeMeta`
/// field.
///
/// ```
/// use schema_roundtrip::{impl_fill, impl_object, TypeMeta};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// struct Widget {
///     type_meta: TypeMeta,
///     size: u32,
/// }
///
/// impl_fill!(Widget { type_meta, size });
/// impl_object!(Widget);
/// ```
pub trait Object:
    Fill + Clone + PartialEq + Debug + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The in-band tag.
    fn type_meta(&self) -> &TypeMeta;

    /// Mutable access to the in-band tag.
    fn type_meta_mut(&mut self) -> &mut TypeMeta;

    /// Short name used in reports and errors.
    fn type_name() -> &'static str;
}

/// Implements [`Object`] for a struct whose tag lives in `type_meta`.
///
/// The reported name defaults to the type's identifier; pass a second
/// argument to override it.
#[macro_export]
macro_rules! impl_object {
    ($ty:ident) => {
        $crate::impl_object!($ty, stringify!($ty));
    };
    ($ty:ty, $name:expr) => {
        impl $crate::Object for $ty {
            fn type_meta(&self) -> &$crate::model::TypeMeta {
                &self.type_meta
            }

            fn type_meta_mut(&mut self) -> &mut $crate::model::TypeMeta {
                &mut self.type_meta
            }

            fn type_name() -> &'static str {
                $name
            }
        }
    };
}
