//! The verification driver.
//!
//! A [`Harness`] owns everything one fuzz iteration needs: the [`Scheme`],
//! the [`Customizers`] registry and the configured codecs. Each call to
//! [`Harness::verify`] selects a kind, generates an instance of it from the
//! input bytes, tags it with the selected kind, and runs the round-trip
//! suite against every codec.
//!
//! The harness holds no mutable state, so one instance can serve many
//! threads.
//!
//! # Example
//!
//! ```
//! use schema_roundtrip::{HarnessBuilder, HarnessConfig};
//!
//! let harness = HarnessBuilder::new()
//!     .with_config(HarnessConfig::quick())
//!     .build()
//!     .unwrap();
//!
//! let data: Vec<u8> = (0..2048u32).map(|i| (i * 7 % 251) as u8).collect();
//! match harness.verify(&data, 3) {
//!     Ok(report) => assert!(!report.outcomes.is_empty()),
//!     Err(e) => assert!(e.is_recoverable(), "{e}"),
//! }
//! ```

use crate::catalog::{select, GroupVersionKind, Scheme};
use crate::codec::{Codec, CodecHandle, JsonCodec};
use crate::config::HarnessConfig;
use crate::customize::Customizers;
use crate::error::RoundTripError;
use crate::generate::{Fill, GenResult, Generator};
use crate::model::default_scheme;
use crate::telemetry::{report_to_observer, ViolationObserver};
use crate::verifier::{round_trip, Outcome};
use crate::Object;
use arbitrary::{Arbitrary, Unstructured};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Outcome of one codec for one instance.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CodecOutcome {
    /// Codec name.
    pub codec: &'static str,
    /// What happened.
    pub outcome: Outcome,
}

/// Result of verifying one instance against every configured codec.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Report {
    /// Name of the verified type.
    pub type_name: &'static str,
    /// Selected kind, rendered with its `Display` form.
    pub kind: Option<String>,
    /// One entry per codec, in configuration order.
    pub outcomes: Vec<CodecOutcome>,
}

impl Report {
    /// True if every codec ran the full suite.
    #[must_use]
    pub fn is_fully_upheld(&self) -> bool {
        self.outcomes.iter().all(|o| o.outcome.is_upheld())
    }

    /// Codecs that could not represent the type.
    #[must_use]
    pub fn unsupported_codecs(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter(|o| !o.outcome.is_upheld())
            .map(|o| o.codec)
            .collect()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)?;
        if let Some(kind) = &self.kind {
            write!(f, " ({kind})")?;
        }
        for o in &self.outcomes {
            write!(f, " {}={}", o.codec, o.outcome)?;
        }
        Ok(())
    }
}

/// One fuzz input split into a selection index and generation bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzInput<'a> {
    /// Index passed to the selector.
    pub type_index: usize,
    /// Bytes consumed by the generator.
    pub data: &'a [u8],
}

impl<'a> Arbitrary<'a> for FuzzInput<'a> {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let type_index = usize::from(u.arbitrary::<u8>()?);
        let data = u.bytes(u.len())?;
        Ok(Self { type_index, data })
    }
}

/// Builds a [`Harness`].
///
/// Defaults: the built-in scheme, [`HarnessConfig::default()`], the
/// built-in customizers and [`TracingObserver`](crate::TracingObserver)
/// for violations.
pub struct HarnessBuilder {
    scheme: Option<Scheme>,
    config: HarnessConfig,
    extra_customizers: Customizers,
    observer: Option<Arc<dyn ViolationObserver>>,
}

impl fmt::Debug for HarnessBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarnessBuilder")
            .field("scheme", &self.scheme.as_ref().map(Scheme::len))
            .field("config", &self.config)
            .field("extra_customizers", &self.extra_customizers)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HarnessBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scheme: None,
            config: HarnessConfig::default(),
            extra_customizers: Customizers::new(),
            observer: None,
        }
    }

    /// Uses `scheme` instead of the built-in kinds.
    #[must_use]
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = Some(scheme);
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: HarnessConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a customizer for `T`, overriding any built-in one.
    #[must_use]
    pub fn with_customizer<T, F>(mut self, customize: F) -> Self
    where
        T: Fill,
        F: Fn(&mut T, &mut Generator<'_, '_>) -> GenResult<()> + Send + Sync + 'static,
    {
        self.extra_customizers.register::<T, F>(customize);
        self
    }

    /// Sends violations to `observer` before they are returned.
    #[must_use]
    pub fn with_violation_observer(mut self, observer: Arc<dyn ViolationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Validates the settings and builds the harness.
    ///
    /// # Errors
    ///
    /// Returns [`RoundTripError::InvalidRequest`] if the configuration is
    /// invalid or no kind is left to select.
    pub fn build(self) -> Result<Harness, RoundTripError> {
        self.config.validate()?;
        let scheme = Arc::new(self.scheme.unwrap_or_else(default_scheme));
        if scheme
            .external_kinds(&self.config.non_round_trippable)
            .is_empty()
        {
            return Err(RoundTripError::InvalidRequest {
                info: "no selectable kinds: the scheme has no external kind outside the exclusion list"
                    .to_owned(),
            });
        }

        let mut customizers = Customizers::with_defaults(JsonCodec::new(scheme.clone()));
        customizers.extend(self.extra_customizers);

        let codecs = self
            .config
            .codecs
            .iter()
            .map(|kind| CodecHandle::new(*kind, scheme.clone()))
            .collect();

        Ok(Harness {
            scheme,
            customizers: Arc::new(customizers),
            config: self.config,
            codecs,
            observer: self.observer,
        })
    }
}

/// Selection, generation and verification for one input at a time.
pub struct Harness {
    scheme: Arc<Scheme>,
    customizers: Arc<Customizers>,
    config: HarnessConfig,
    codecs: Vec<CodecHandle>,
    observer: Option<Arc<dyn ViolationObserver>>,
}

impl fmt::Debug for Harness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harness")
            .field("kinds", &self.scheme.len())
            .field("customizers", &self.customizers.len())
            .field("config", &self.config)
            .field(
                "codecs",
                &self.codecs.iter().map(Codec::name).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Harness {
    /// A harness with every default.
    ///
    /// # Errors
    ///
    /// Fails only if the built-in kinds cannot be registered.
    pub fn new() -> Result<Self, RoundTripError> {
        HarnessBuilder::new().build()
    }

    /// The kinds this harness knows.
    #[must_use]
    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Kinds that [`Self::verify`] can select, in selection order.
    #[must_use]
    pub fn selectable_kinds(&self) -> Vec<&GroupVersionKind> {
        self.scheme
            .external_kinds(&self.config.non_round_trippable)
            .into_iter()
            .map(|entry| entry.gvk())
            .collect()
    }

    /// Selects a kind with `type_index`, generates an instance from `data`
    /// and verifies it against every codec.
    ///
    /// # Errors
    ///
    /// - [`RoundTripError::Exhausted`] if `data` ran out; skip the input.
    /// - [`RoundTripError::Violation`] if an invariant failed.
    /// - [`RoundTripError::Generation`] if a customizer failed otherwise.
    pub fn verify(&self, data: &[u8], type_index: usize) -> Result<Report, RoundTripError> {
        let kinds = self.scheme.external_kinds(&self.config.non_round_trippable);
        let entry = select(type_index, &kinds).ok_or_else(|| RoundTripError::InvalidRequest {
            info: "no selectable kinds".to_owned(),
        })?;
        let result = entry.run(self, data);
        if let Err(RoundTripError::Exhausted(e)) = &result {
            debug!(kind = %entry.gvk(), "skipping input: {e}");
        }
        result
    }

    /// [`Self::verify`] for an input split by [`FuzzInput`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::verify`].
    pub fn verify_input(&self, input: FuzzInput<'_>) -> Result<Report, RoundTripError> {
        self.verify(input.data, input.type_index)
    }

    /// Generates a `T` from `data` with the registered customizers. The
    /// type tag is left blank.
    ///
    /// # Errors
    ///
    /// Returns [`RoundTripError::Exhausted`] if `data` ran out.
    pub fn generate<T: Object>(&self, data: &[u8]) -> Result<T, RoundTripError> {
        let mut g = Generator::new(data, &self.customizers, self.config.limits);
        let mut object = T::default();
        g.generate(&mut object)
            .map_err(|e| RoundTripError::from_generation(T::type_name(), e))?;
        object.type_meta_mut().clear();
        Ok(object)
    }

    /// Runs the round-trip suite for `object` against every codec.
    ///
    /// # Errors
    ///
    /// Returns [`RoundTripError::Violation`] for the first failed check,
    /// after reporting it to the observer.
    pub fn verify_object<T: Object>(
        &self,
        object: &T,
        kind: Option<&GroupVersionKind>,
    ) -> Result<Report, RoundTripError> {
        let mut outcomes = Vec::with_capacity(self.codecs.len());
        for codec in &self.codecs {
            match round_trip(codec, &self.scheme, object) {
                Ok(outcome) => {
                    debug!(type_name = T::type_name(), codec = codec.name(), %outcome);
                    outcomes.push(CodecOutcome {
                        codec: codec.name(),
                        outcome,
                    });
                },
                Err(mut violation) => {
                    violation.kind = kind.map(ToString::to_string);
                    report_to_observer(self.observer.as_ref(), &violation);
                    return Err(RoundTripError::Violation(violation));
                },
            }
        }
        Ok(Report {
            type_name: T::type_name(),
            kind: kind.map(ToString::to_string),
            outcomes,
        })
    }

    /// Generates a `T` tagged with `gvk`, so that exact version is what
    /// the codecs write.
    fn tagged_instance<T: Object>(
        &self,
        data: &[u8],
        gvk: &GroupVersionKind,
    ) -> Result<T, RoundTripError> {
        let mut object = self.generate::<T>(data)?;
        *object.type_meta_mut() = gvk.to_type_meta();
        Ok(object)
    }

    /// Generates a `T` for the selected `gvk` and verifies it.
    pub(crate) fn round_trip_kind<T: Object>(
        &self,
        data: &[u8],
        gvk: &GroupVersionKind,
    ) -> Result<Report, RoundTripError> {
        let object = self.tagged_instance::<T>(data, gvk)?;
        self.verify_object(&object, Some(gvk))
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
    use crate::codec::CodecKind;
    use crate::model::{ListOptions, Service, Status, Table, Time};
    use crate::telemetry::{CollectingObserver, RoundTripStep};

    fn input(seed: u32) -> Vec<u8> {
        (0..32768u32)
            .map(|i| (i.wrapping_mul(2_246_822_519).wrapping_add(seed) >> 11) as u8)
            .collect()
    }

    #[test]
    fn test_harness_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Harness>();
    }

    #[test]
    fn test_default_selection_skips_read_only_kinds() {
        let harness = Harness::new().unwrap();
        let kinds: Vec<String> = harness
            .selectable_kinds()
            .iter()
            .map(|g| g.kind.clone())
            .collect();
        assert_eq!(kinds.len(), 10);
        assert!(!kinds.contains(&"GetOptions".to_owned()));
        assert!(!kinds.contains(&"DeleteOptions".to_owned()));
    }

    #[test]
    fn test_every_kind_round_trips() {
        let harness = Harness::new().unwrap();
        let count = harness.selectable_kinds().len();
        for index in 0..count {
            for seed in 0..4 {
                match harness.verify(&input(seed), index) {
                    Ok(report) => assert!(report.is_fully_upheld(), "{report}"),
                    Err(e) => assert!(e.is_recoverable(), "kind {index}: {e}"),
                }
            }
        }
    }

    #[test]
    fn test_generated_objects_are_untagged() {
        let harness = Harness::new().unwrap();
        let status: Status = harness.generate(&input(1)).unwrap();
        assert!(status.type_meta.is_empty());
    }

    #[test]
    fn test_external_only_kind_is_stamped() {
        let harness = Harness::new().unwrap();
        let gvk = harness
            .selectable_kinds()
            .into_iter()
            .find(|g| g.kind == "ListOptions")
            .cloned()
            .unwrap();
        let report = harness
            .round_trip_kind::<ListOptions>(&input(2), &gvk)
            .unwrap();
        assert_eq!(report.kind.as_deref(), Some("meta.k8s.io/v1, Kind=ListOptions"));
    }

    #[test]
    fn test_non_preferred_version_is_encoded_as_selected() {
        let harness = Harness::new().unwrap();
        let gvk = harness
            .selectable_kinds()
            .into_iter()
            .find(|g| g.kind == "Table" && g.version == "v1beta1")
            .cloned()
            .unwrap();
        let data = input(5);

        let table: Table = harness.tagged_instance(&data, &gvk).unwrap();
        let json = harness.codecs.iter().find(|c| c.name() == "json").unwrap();
        let wire: serde_json::Value = serde_json::from_slice(&json.encode(&table).unwrap()).unwrap();
        assert_eq!(wire["typeMeta"]["apiVersion"], "meta.k8s.io/v1beta1");
        assert_eq!(wire["typeMeta"]["kind"], "Table");

        let report = harness.round_trip_kind::<Table>(&data, &gvk).unwrap();
        assert_eq!(report.kind.as_deref(), Some("meta.k8s.io/v1beta1, Kind=Table"));
        assert!(report.is_fully_upheld(), "{report}");
    }

    #[test]
    fn test_exhaustion_is_recoverable() {
        let harness = Harness::new().unwrap();
        let err = harness.verify(&[1, 2, 3], 0).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_violation_reaches_observer() {
        let observer = Arc::new(CollectingObserver::new());
        let harness = HarnessBuilder::new()
            .with_config(HarnessConfig {
                codecs: vec![CodecKind::Json],
                ..HarnessConfig::default()
            })
            .with_customizer::<Service, _>(|s, g| {
                g.generate_default(s)?;
                // sub-second precision is lost by the textual form
                let nanos = g.cursor().get_u32()? % 999_999_999 + 1;
                s.metadata.creation_timestamp =
                    Time::from_unix(1_000, i64::from(nanos)).unwrap_or_default();
                Ok(())
            })
            .with_violation_observer(observer.clone())
            .build()
            .unwrap();
        let service_index = harness
            .selectable_kinds()
            .iter()
            .position(|g| g.kind == "Service")
            .unwrap();

        let err = harness.verify(&input(5), service_index).unwrap_err();
        let violation = err.violation().unwrap();
        assert_eq!(violation.step, RoundTripStep::DecodeEquality);
        assert_eq!(violation.codec, "json");
        assert!(violation.kind.as_deref().unwrap().contains("Service"));
        assert_eq!(observer.len(), 1);
        assert!(observer.has_violation(RoundTripStep::DecodeEquality));
    }

    #[test]
    fn test_empty_selection_is_invalid() {
        let config = HarnessConfig {
            non_round_trippable: ["Service".to_owned()].into(),
            ..HarnessConfig::default()
        };
        let mut scheme = Scheme::new();
        scheme
            .register::<Service>(GroupVersionKind::new("serving.knative.dev", "v1", "Service"))
            .unwrap();
        let err = HarnessBuilder::new()
            .with_scheme(scheme)
            .with_config(config)
            .build()
            .unwrap_err();
        assert!(matches!(err, RoundTripError::InvalidRequest { .. }));
    }

    #[test]
    fn test_fuzz_input_splits_index() {
        let raw = [7u8, 1, 2, 3];
        let mut u = Unstructured::new(&raw);
        let parsed = FuzzInput::arbitrary(&mut u).unwrap();
        assert_eq!(parsed.type_index, 7);
        assert_eq!(parsed.data, &[1, 2, 3]);
    }
}
