//! The built-in object family.
//!
//! Metadata kinds from `meta.k8s.io` (most of them registered both
//! internally and externally) and a serving `Service` registered only
//! externally. [`default_scheme`] wires them into a [`Scheme`].

pub mod meta;
pub mod quantity;
pub mod runtime;
pub mod serving;
pub mod table;

pub use meta::{
    ApiGroup, DeleteOptions, GetOptions, GroupVersionForDiscovery, LabelSelector,
    LabelSelectorOperator, LabelSelectorRequirement, List, ListMeta, ListOptions,
    ManagedFieldsEntry, ObjectMeta, OwnerReference, ResourceVersionMatch, Status, Time, TypeMeta,
    WatchEvent,
};
pub use quantity::Quantity;
pub use runtime::{EmbeddedObject, RawExtension, Unknown};
pub use serving::{
    Condition, ConditionsAccessor, Service, ServiceSpec, ServiceStatus, Url, UserInfo,
};
pub use table::{Cell, Table, TableColumnDefinition, TableOptions, TableRow, TableRowCondition};

use crate::catalog::{GroupVersionKind, Scheme};
use crate::error::RoundTripError;

/// Group of the metadata kinds.
pub const META_GROUP: &str = "meta.k8s.io";
/// Group of the serving kinds.
pub const SERVING_GROUP: &str = "serving.knative.dev";

fn meta_v1(kind: &str) -> GroupVersionKind {
    GroupVersionKind::new(META_GROUP, "v1", kind)
}

fn meta_v1beta1(kind: &str) -> GroupVersionKind {
    GroupVersionKind::new(META_GROUP, "v1beta1", kind)
}

/// Registers every built-in kind in `scheme`.
pub fn add_to_scheme(scheme: &mut Scheme) -> Result<(), RoundTripError> {
    scheme.register_internal_and_external::<Status>(meta_v1("Status"))?;
    scheme.register_internal_and_external::<ApiGroup>(meta_v1("APIGroup"))?;
    scheme.register_internal_and_external::<WatchEvent>(meta_v1("WatchEvent"))?;
    scheme.register_internal_and_external::<List>(meta_v1("List"))?;
    scheme.register_internal_and_external::<Table>(meta_v1("Table"))?;
    scheme.register_internal_and_external::<TableOptions>(meta_v1("TableOptions"))?;
    scheme.register::<Table>(meta_v1beta1("Table"))?;
    scheme.register::<TableOptions>(meta_v1beta1("TableOptions"))?;

    scheme.register::<GetOptions>(meta_v1("GetOptions"))?;
    scheme.register::<DeleteOptions>(meta_v1("DeleteOptions"))?;
    scheme.register::<ListOptions>(meta_v1("ListOptions"))?;

    scheme.register::<Service>(GroupVersionKind::new(SERVING_GROUP, "v1", "Service"))?;
    Ok(())
}

/// A scheme holding every built-in kind.
#[must_use]
pub fn default_scheme() -> Scheme {
    let mut scheme = Scheme::new();
    let registered = add_to_scheme(&mut scheme);
    debug_assert!(registered.is_ok(), "built-in kinds collide: {registered:?}");
    scheme
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
    use std::collections::BTreeSet;

    #[test]
    fn test_default_scheme_contents() {
        let scheme = default_scheme();
        assert!(scheme.is_internal_and_external::<Table>());
        assert!(!scheme.is_internal_and_external::<Service>());
        assert_eq!(scheme.kinds_for::<Table>().len(), 3);
        assert_eq!(scheme.external_kind_for::<Table>(), Some(&meta_v1("Table")));
        assert_eq!(scheme.external_kinds(&BTreeSet::new()).len(), 12);
    }

    #[test]
    fn test_add_to_scheme_twice_fails() {
        let mut scheme = default_scheme();
        assert!(add_to_scheme(&mut scheme).is_err());
    }
}
