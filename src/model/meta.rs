//! Object metadata and the `meta.k8s.io` kinds.

use crate::generate::{Fill, GenResult, Generator};
use crate::label::{is_qualified_name, is_valid_label_value};
use crate::model::runtime::{EmbeddedObject, RawExtension};
use crate::{impl_fill, impl_object};
use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// In-band type identity carried by every top-level object.
///
/// Blank in memory; codecs stamp it on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    /// `group/version`, or just `version` for the core group.
    pub api_version: String,
    /// Kind name.
    pub kind: String,
}

impl TypeMeta {
    /// Creates a populated type tag.
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
        }
    }

    /// True when neither field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.api_version.is_empty() && self.kind.is_empty()
    }

    /// Blanks both fields.
    pub fn clear(&mut self) {
        self.api_version.clear();
        self.kind.clear();
    }
}

impl_fill!(TypeMeta { api_version, kind });

/// Half-width of the second range used by structural [`Time`] generation,
/// close to the limit of what `chrono` can represent.
const TIME_SPAN_SECS: i64 = 8_000_000_000_000;

/// A UTC timestamp.
///
/// The textual form is RFC 3339 with whole seconds, so sub-second precision
/// and years past 9999 do not survive a JSON round trip. The binary form
/// keeps seconds and nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(DateTime<Utc>);

impl Default for Time {
    fn default() -> Self {
        Self(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl Time {
    /// Builds a timestamp from seconds and nanoseconds since the epoch.
    /// Nanoseconds outside `0..1e9` carry into the seconds.
    #[must_use]
    pub fn from_unix(secs: i64, nanos: i64) -> Option<Self> {
        let secs = secs.checked_add(nanos.div_euclid(1_000_000_000))?;
        let nanos = nanos.rem_euclid(1_000_000_000) as u32;
        DateTime::from_timestamp(secs, nanos).map(Self)
    }

    /// Drops sub-second precision so the value survives the textual form.
    #[must_use]
    pub fn rfc3339_copy(self) -> Self {
        self.0.with_nanosecond(0).map_or(self, Self)
    }

    /// Seconds since the epoch.
    #[must_use]
    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    /// Sub-second nanoseconds.
    #[must_use]
    pub fn subsec_nanos(&self) -> u32 {
        self.0.timestamp_subsec_nanos()
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

impl Serialize for Time {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            (self.unix_seconds(), self.subsec_nanos()).serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Time {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            DateTime::parse_from_rfc3339(&text)
                .map(|t| Self(t.with_timezone(&Utc)))
                .map_err(|e| de::Error::custom(format!("invalid timestamp {text:?}: {e}")))
        } else {
            let (secs, nanos) = <(i64, u32)>::deserialize(deserializer)?;
            Self::from_unix(secs, i64::from(nanos))
                .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {secs}s")))
        }
    }
}

impl Fill for Time {
    fn fill(&mut self, g: &mut Generator<'_, '_>) -> GenResult<()> {
        let secs = g.cursor().get_i64()?.rem_euclid(2 * TIME_SPAN_SECS) - TIME_SPAN_SECS;
        let nanos = g.cursor().get_u32()?;
        // every second in the span is representable
        *self = Self::from_unix(secs, i64::from(nanos)).unwrap_or_default();
        Ok(())
    }
}

/// A reference from an object to its owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    /// API version of the owner.
    pub api_version: String,
    /// Kind of the owner.
    pub kind: String,
    /// Name of the owner.
    pub name: String,
    /// UID of the owner.
    pub uid: String,
    /// Whether the owner is the managing controller.
    pub controller: Option<bool>,
    /// Whether deletion of the owner waits for this object.
    pub block_owner_deletion: Option<bool>,
}

impl_fill!(OwnerReference {
    api_version,
    kind,
    name,
    uid,
    controller,
    block_owner_deletion
});

/// Records which manager owns which fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedFieldsEntry {
    /// Name of the field manager.
    pub manager: String,
    /// Operation that produced the entry.
    pub operation: String,
    /// API version the field set is expressed in.
    pub api_version: String,
    /// When the entry was last updated.
    pub time: Option<Time>,
    /// Serialized field set.
    #[serde(with = "serde_bytes")]
    pub fields_v1: Option<Vec<u8>>,
    /// Subresource the entry applies to.
    pub subresource: String,
}

impl_fill!(ManagedFieldsEntry {
    manager,
    operation,
    api_version,
    time,
    fields_v1,
    subresource
});

/// Metadata every persisted object carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Object name.
    pub name: String,
    /// Prefix used to generate a name.
    pub generate_name: String,
    /// Namespace.
    pub namespace: String,
    /// Unique identifier.
    pub uid: String,
    /// Opaque version used for optimistic concurrency.
    pub resource_version: String,
    /// Sequence number of the desired state.
    pub generation: i64,
    /// Creation time.
    pub creation_timestamp: Time,
    /// Deletion time, set once deletion is requested.
    pub deletion_timestamp: Option<Time>,
    /// Grace period for deletion.
    pub deletion_grace_period_seconds: Option<i64>,
    /// Identifying labels.
    pub labels: Option<BTreeMap<String, String>>,
    /// Non-identifying annotations.
    pub annotations: Option<BTreeMap<String, String>>,
    /// Owners of this object.
    pub owner_references: Option<Vec<OwnerReference>>,
    /// Finalizers that must run before deletion.
    pub finalizers: Option<Vec<String>>,
    /// Field ownership records.
    pub managed_fields: Option<Vec<ManagedFieldsEntry>>,
}

impl_fill!(ObjectMeta {
    name,
    generate_name,
    namespace,
    uid,
    resource_version,
    generation,
    creation_timestamp,
    deletion_timestamp,
    deletion_grace_period_seconds,
    labels,
    annotations,
    owner_references,
    finalizers,
    managed_fields
});

/// Metadata of list responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    /// Link to this list.
    pub self_link: String,
    /// Resource version of the list.
    pub resource_version: String,
    /// Continuation token.
    #[serde(rename = "continue")]
    pub continue_token: String,
    /// Number of items not yet returned.
    pub remaining_item_count: Option<i64>,
}

impl_fill!(ListMeta {
    self_link,
    resource_version,
    continue_token,
    remaining_item_count
});

/// How a requested resource version is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceVersionMatch(pub String);

impl ResourceVersionMatch {
    /// Return data at exactly the given resource version.
    pub const EXACT: &'static str = "Exact";
    /// Return data at least as new as the given resource version.
    pub const NOT_OLDER_THAN: &'static str = "NotOlderThan";
}

impl Fill for ResourceVersionMatch {
    fn fill(&mut self, g: &mut Generator<'_, '_>) -> GenResult<()> {
        g.generate(&mut self.0)
    }
}

/// Selector operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelSelectorOperator {
    /// Label value is one of the listed values.
    #[default]
    In,
    /// Label value is none of the listed values.
    NotIn,
    /// Label is present.
    Exists,
    /// Label is absent.
    DoesNotExist,
}

impl LabelSelectorOperator {
    /// Every operator, in declaration order.
    pub const ALL: [Self; 4] = [Self::In, Self::NotIn, Self::Exists, Self::DoesNotExist];

    /// True for operators that compare against a value list.
    #[must_use]
    pub const fn takes_values(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

impl Fill for LabelSelectorOperator {
    fn fill(&mut self, g: &mut Generator<'_, '_>) -> GenResult<()> {
        *self = Self::ALL[g.cursor().get_int()? % Self::ALL.len()];
        Ok(())
    }
}

/// One `key operator values` expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelectorRequirement {
    /// Label key.
    pub key: String,
    /// Operator.
    pub operator: LabelSelectorOperator,
    /// Values for `In`/`NotIn`.
    pub values: Option<Vec<String>>,
}

impl_fill!(LabelSelectorRequirement {
    key,
    operator,
    values
});

/// Label query over a set of objects.
///
/// Decoding validates every key and value and puts the selector in its
/// canonical form: expressions sorted by key, each value list sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawLabelSelector")]
pub struct LabelSelector {
    /// Exact-match labels.
    pub match_labels: Option<BTreeMap<String, String>>,
    /// Expression requirements, all of which must hold.
    pub match_expressions: Option<Vec<LabelSelectorRequirement>>,
}

impl_fill!(LabelSelector {
    match_labels,
    match_expressions
});

impl LabelSelector {
    /// True when the selector has neither labels nor expressions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.match_labels.as_ref().is_none_or(BTreeMap::is_empty)
            && self.match_expressions.as_ref().is_none_or(Vec::is_empty)
    }

    /// Sorts expressions by key and every value list.
    pub fn canonicalize(&mut self) {
        if let Some(expressions) = &mut self.match_expressions {
            for requirement in expressions.iter_mut() {
                if let Some(values) = &mut requirement.values {
                    values.sort();
                }
            }
            expressions.sort_by(|a, b| a.key.cmp(&b.key));
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLabelSelector {
    match_labels: Option<BTreeMap<String, String>>,
    match_expressions: Option<Vec<LabelSelectorRequirement>>,
}

impl TryFrom<RawLabelSelector> for LabelSelector {
    type Error = String;

    fn try_from(raw: RawLabelSelector) -> Result<Self, Self::Error> {
        for (key, value) in raw.match_labels.iter().flatten() {
            if !is_qualified_name(key) {
                return Err(format!("invalid label key {key:?}"));
            }
            if !is_valid_label_value(value) {
                return Err(format!("invalid label value {value:?} for key {key:?}"));
            }
        }
        for requirement in raw.match_expressions.iter().flatten() {
            if !is_qualified_name(&requirement.key) {
                return Err(format!("invalid expression key {:?}", requirement.key));
            }
            if let Some(bad) = requirement
                .values
                .iter()
                .flatten()
                .find(|v| !is_valid_label_value(v))
            {
                return Err(format!("invalid expression value {bad:?}"));
            }
        }
        let mut selector = Self {
            match_labels: raw.match_labels,
            match_expressions: raw.match_expressions,
        };
        selector.canonicalize();
        Ok(selector)
    }
}

/// Result of an operation that did not return an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// Type tag.
    pub type_meta: TypeMeta,
    /// List metadata.
    pub metadata: ListMeta,
    /// `Success` or `Failure`.
    pub status: String,
    /// Human-readable description.
    pub message: String,
    /// Machine-readable reason.
    pub reason: String,
    /// Suggested HTTP status code.
    pub code: i32,
}

impl_fill!(Status {
    type_meta,
    metadata,
    status,
    message,
    reason,
    code
});
impl_object!(Status);

/// A group/version pair advertised by discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupVersionForDiscovery {
    /// `group/version`.
    pub group_version: String,
    /// Version only.
    pub version: String,
}

impl_fill!(GroupVersionForDiscovery {
    group_version,
    version
});

/// Discovery document for one API group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGroup {
    /// Type tag.
    pub type_meta: TypeMeta,
    /// Group name.
    pub name: String,
    /// Served versions.
    pub versions: Vec<GroupVersionForDiscovery>,
    /// Preferred version.
    pub preferred_version: Option<GroupVersionForDiscovery>,
}

impl_fill!(ApiGroup {
    type_meta,
    name,
    versions,
    preferred_version
});
impl_object!(ApiGroup, "APIGroup");

/// Query options for list and watch calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    /// Type tag.
    pub type_meta: TypeMeta,
    /// Label selector expression.
    pub label_selector: String,
    /// Field selector expression.
    pub field_selector: String,
    /// Whether to watch.
    pub watch: bool,
    /// Requested resource version.
    pub resource_version: String,
    /// Interpretation of `resource_version`.
    pub resource_version_match: ResourceVersionMatch,
    /// Server-side timeout.
    pub timeout_seconds: Option<i64>,
    /// Page size.
    pub limit: i64,
    /// Continuation token.
    #[serde(rename = "continue")]
    pub continue_token: String,
}

impl_fill!(ListOptions {
    type_meta,
    label_selector,
    field_selector,
    watch,
    resource_version,
    resource_version_match,
    timeout_seconds,
    limit,
    continue_token
});
impl_object!(ListOptions);

/// Options for a get call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOptions {
    /// Type tag.
    pub type_meta: TypeMeta,
    /// Requested resource version.
    pub resource_version: String,
}

impl_fill!(GetOptions {
    type_meta,
    resource_version
});
impl_object!(GetOptions);

/// Options for a delete call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOptions {
    /// Type tag.
    pub type_meta: TypeMeta,
    /// Override for the object's grace period.
    pub grace_period_seconds: Option<i64>,
    /// Garbage collection policy.
    pub propagation_policy: Option<String>,
    /// Dry-run stages.
    pub dry_run: Option<Vec<String>>,
}

impl_fill!(DeleteOptions {
    type_meta,
    grace_period_seconds,
    propagation_policy,
    dry_run
});
impl_object!(DeleteOptions);

/// A single watch notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchEvent {
    /// Type tag.
    pub type_meta: TypeMeta,
    /// `ADDED`, `MODIFIED`, `DELETED`, ...
    #[serde(rename = "type")]
    pub event_type: String,
    /// The affected object.
    pub object: EmbeddedObject,
}

impl_fill!(WatchEvent {
    type_meta,
    event_type,
    object
});
impl_object!(WatchEvent);

/// Heterogeneous list of encoded objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    /// Type tag.
    pub type_meta: TypeMeta,
    /// List metadata.
    pub metadata: ListMeta,
    /// Items, each a self-describing encoded object.
    pub items: Vec<RawExtension>,
}

impl_fill!(List {
    type_meta,
    metadata,
    items
});
impl_object!(List);

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
    fn test_time_text_form_drops_nanos() {
        let t = Time::from_unix(1_700_000_000, 123_456_789).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"2023-11-14T22:13:20Z\"");
        let back: Time = serde_json::from_str(&json).unwrap();
        assert_ne!(back, t);
        assert_eq!(back, t.rfc3339_copy());
    }

    #[test]
    fn test_time_nanos_carry_into_seconds() {
        let t = Time::from_unix(10, 2_500_000_000).unwrap();
        assert_eq!(t.unix_seconds(), 12);
        assert_eq!(t.subsec_nanos(), 500_000_000);
    }

    #[test]
    fn test_time_far_future_does_not_parse_back() {
        let t = Time::from_unix(300_000_000_000, 0).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert!(serde_json::from_str::<Time>(&json).is_err());
    }

    #[test]
    fn test_label_selector_decode_canonicalizes() {
        let json = r#"{"matchLabels":null,"matchExpressions":[
            {"key":"zeta","operator":"In","values":["b","a"]},
            {"key":"alpha","operator":"Exists","values":null}]}"#;
        let selector: LabelSelector = serde_json::from_str(json).unwrap();
        let expressions = selector.match_expressions.unwrap();
        assert_eq!(expressions[0].key, "alpha");
        assert_eq!(
            expressions[1].values.as_deref(),
            Some(&["a".to_owned(), "b".to_owned()][..])
        );
    }

    #[test]
    fn test_label_selector_decode_rejects_bad_key() {
        let json = r#"{"matchLabels":{"-bad":"v"},"matchExpressions":null}"#;
        assert!(serde_json::from_str::<LabelSelector>(json).is_err());
    }

    #[test]
    fn test_label_selector_is_empty() {
        let mut selector = LabelSelector::default();
        assert!(selector.is_empty());
        selector.match_labels = Some(BTreeMap::new());
        selector.match_expressions = Some(Vec::new());
        assert!(selector.is_empty());
        selector.match_expressions = Some(vec![LabelSelectorRequirement::default()]);
        assert!(!selector.is_empty());
    }

    #[test]
    fn test_type_meta_clear() {
        let mut meta = TypeMeta::new("v1", "Status");
        assert!(!meta.is_empty());
        meta.clear();
        assert!(meta.is_empty());
    }
}
