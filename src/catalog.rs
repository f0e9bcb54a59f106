//! Type catalog: which kinds exist and which Rust type backs each one.
//!
//! A [`Scheme`] maps every [`GroupVersionKind`] to a [`KindEntry`]. A type
//! may be registered under several kinds: external versions that appear on
//! the wire, and optionally the internal version [`INTERNAL_VERSION`]. Types
//! with both are *dual-representation* types; codecs treat their tag
//! differently (see [`crate::codec`]).
//!
//! The scheme is built once at setup and shared read-only afterwards.

use crate::error::RoundTripError;
use crate::harness::{Harness, Report};
use crate::model::TypeMeta;
use crate::Object;
use std::any::TypeId;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Version name of the in-memory-only representation.
pub const INTERNAL_VERSION: &str = "__internal";

/// Fully qualified kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupVersionKind {
    /// API group; empty for the core group.
    pub group: String,
    /// Version within the group.
    pub version: String,
    /// Kind name.
    pub kind: String,
}

impl GroupVersionKind {
    /// Creates a kind.
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// The same kind under the internal version.
    #[must_use]
    pub fn internal(&self) -> Self {
        Self::new(self.group.clone(), INTERNAL_VERSION, self.kind.clone())
    }

    /// True for the internal version.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.version == INTERNAL_VERSION
    }

    /// `group/version`, or `version` for the core group.
    #[must_use]
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Reads a kind from an in-band tag.
    #[must_use]
    pub fn from_type_meta(meta: &TypeMeta) -> Self {
        let (group, version) = meta
            .api_version
            .split_once('/')
            .unwrap_or(("", meta.api_version.as_str()));
        Self::new(group, version, meta.kind.clone())
    }

    /// The in-band tag for this kind.
    #[must_use]
    pub fn to_type_meta(&self) -> TypeMeta {
        TypeMeta::new(self.api_version(), self.kind.clone())
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

type RoundTripFn = fn(&Harness, &[u8], &GroupVersionKind) -> Result<Report, RoundTripError>;

/// One registered kind.
#[derive(Clone)]
pub struct KindEntry {
    gvk: GroupVersionKind,
    type_id: TypeId,
    type_name: &'static str,
    round_trip: RoundTripFn,
}

impl fmt::Debug for KindEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindEntry")
            .field("gvk", &self.gvk)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl KindEntry {
    /// The kind.
    #[must_use]
    pub const fn gvk(&self) -> &GroupVersionKind {
        &self.gvk
    }

    /// Name of the backing type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Generates an instance of the backing type from `data` and verifies it.
    pub(crate) fn run(&self, harness: &Harness, data: &[u8]) -> Result<Report, RoundTripError> {
        (self.round_trip)(harness, data, &self.gvk)
    }
}

/// Registry of kinds.
#[derive(Debug, Clone, Default)]
pub struct Scheme {
    kinds: BTreeMap<GroupVersionKind, KindEntry>,
    by_type: BTreeMap<TypeId, Vec<GroupVersionKind>>,
}

impl Scheme {
    /// Creates an empty scheme.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `gvk`. The first external kind registered for a
    /// type is its preferred kind.
    ///
    /// # Errors
    ///
    /// Returns [`RoundTripError::InvalidRequest`] if `gvk` is already taken
    /// or has an empty kind name.
    pub fn register<T: Object>(&mut self, gvk: GroupVersionKind) -> Result<(), RoundTripError> {
        if gvk.kind.is_empty() || gvk.version.is_empty() {
            return Err(RoundTripError::InvalidRequest {
                info: format!("cannot register {} with an empty version or kind", T::type_name()),
            });
        }
        if let Some(existing) = self.kinds.get(&gvk) {
            return Err(RoundTripError::InvalidRequest {
                info: format!("{gvk} is already registered to {}", existing.type_name),
            });
        }
        self.by_type
            .entry(TypeId::of::<T>())
            .or_default()
            .push(gvk.clone());
        self.kinds.insert(
            gvk.clone(),
            KindEntry {
                gvk,
                type_id: TypeId::of::<T>(),
                type_name: T::type_name(),
                round_trip: Harness::round_trip_kind::<T>,
            },
        );
        Ok(())
    }

    /// Registers `T` under `gvk` and under its internal version.
    pub fn register_internal_and_external<T: Object>(
        &mut self,
        gvk: GroupVersionKind,
    ) -> Result<(), RoundTripError> {
        let internal = gvk.internal();
        self.register::<T>(gvk)?;
        if !self.kinds.contains_key(&internal) {
            self.register::<T>(internal)?;
        }
        Ok(())
    }

    /// Number of registered kinds, internal ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Looks up a kind.
    #[must_use]
    pub fn entry(&self, gvk: &GroupVersionKind) -> Option<&KindEntry> {
        self.kinds.get(gvk)
    }

    /// The type registered under `gvk`.
    #[must_use]
    pub fn type_id_of(&self, gvk: &GroupVersionKind) -> Option<TypeId> {
        self.kinds.get(gvk).map(|entry| entry.type_id)
    }

    /// Every kind `T` is registered under, in registration order.
    #[must_use]
    pub fn kinds_for<T: Object>(&self) -> &[GroupVersionKind] {
        self.by_type
            .get(&TypeId::of::<T>())
            .map_or(&[], Vec::as_slice)
    }

    /// The preferred external kind of `T`.
    #[must_use]
    pub fn external_kind_for<T: Object>(&self) -> Option<&GroupVersionKind> {
        self.kinds_for::<T>().iter().find(|gvk| !gvk.is_internal())
    }

    /// True if `T` has both an internal and an external kind.
    #[must_use]
    pub fn is_internal_and_external<T: Object>(&self) -> bool {
        let kinds = self.kinds_for::<T>();
        kinds.iter().any(GroupVersionKind::is_internal)
            && kinds.iter().any(|gvk| !gvk.is_internal())
    }

    /// External kinds whose name is not in `excluded`, in sorted order.
    #[must_use]
    pub fn external_kinds(&self, excluded: &BTreeSet<String>) -> Vec<&KindEntry> {
        self.kinds
            .values()
            .filter(|entry| !entry.gvk.is_internal() && !excluded.contains(&entry.gvk.kind))
            .collect()
    }
}

/// Picks the kind at `index` modulo the number of candidates.
/// Returns `None` only when `kinds` is empty.
#[must_use]
pub fn select<'a>(index: usize, kinds: &[&'a KindEntry]) -> Option<&'a KindEntry> {
    if kinds.is_empty() {
        return None;
    }
    kinds.get(index % kinds.len()).copied()
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
    use crate::model::{ApiGroup, GetOptions, Status};

    fn scheme() -> Scheme {
        let mut scheme = Scheme::new();
        scheme
            .register_internal_and_external::<Status>(GroupVersionKind::new(
                "meta.k8s.io",
                "v1",
                "Status",
            ))
            .unwrap();
        scheme
            .register::<GetOptions>(GroupVersionKind::new("meta.k8s.io", "v1", "GetOptions"))
            .unwrap();
        scheme
            .register::<ApiGroup>(GroupVersionKind::new("meta.k8s.io", "v1", "APIGroup"))
            .unwrap();
        scheme
    }

    #[test]
    fn test_api_version_round_trips_through_type_meta() {
        let gvk = GroupVersionKind::new("serving.knative.dev", "v1", "Service");
        let meta = gvk.to_type_meta();
        assert_eq!(meta.api_version, "serving.knative.dev/v1");
        assert_eq!(GroupVersionKind::from_type_meta(&meta), gvk);

        let core = GroupVersionKind::new("", "v1", "Pod");
        assert_eq!(core.api_version(), "v1");
        assert_eq!(GroupVersionKind::from_type_meta(&core.to_type_meta()), core);
    }

    #[test]
    fn test_dual_representation_detection() {
        let scheme = scheme();
        assert!(scheme.is_internal_and_external::<Status>());
        assert!(!scheme.is_internal_and_external::<GetOptions>());
        assert_eq!(scheme.kinds_for::<Status>().len(), 2);
        assert_eq!(
            scheme.external_kind_for::<Status>().unwrap().version,
            "v1"
        );
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut scheme = scheme();
        let err = scheme
            .register::<ApiGroup>(GroupVersionKind::new("meta.k8s.io", "v1", "Status"))
            .unwrap_err();
        assert!(matches!(err, RoundTripError::InvalidRequest { .. }));
    }

    #[test]
    fn test_external_kinds_skip_internal_and_excluded() {
        let scheme = scheme();
        let excluded: BTreeSet<String> = ["GetOptions".to_owned()].into();
        let kinds: Vec<_> = scheme
            .external_kinds(&excluded)
            .iter()
            .map(|e| e.gvk().kind.clone())
            .collect();
        assert_eq!(kinds, ["APIGroup", "Status"]);
    }

    #[test]
    fn test_select_wraps_index() {
        let scheme = scheme();
        let kinds = scheme.external_kinds(&BTreeSet::new());
        assert_eq!(kinds.len(), 3);
        let a = select(1, &kinds).unwrap();
        let b = select(4, &kinds).unwrap();
        assert_eq!(a.gvk(), b.gvk());
        assert!(select(0, &[]).is_none());
    }
}
