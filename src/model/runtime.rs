//! Opaque payloads: raw extensions and embedded objects.

use crate::generate::{Fill, GenResult, Generator};
use crate::impl_fill;
use serde::{ser, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;

/// An already-encoded object carried inside another object.
///
/// In text formats the payload is inlined verbatim as a JSON value (or
/// `null` when empty), so only valid JSON survives encoding. Binary formats
/// carry the bytes as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawExtension {
    /// Encoded payload.
    pub raw: Vec<u8>,
}

impl RawExtension {
    /// Wraps an encoded payload.
    #[must_use]
    pub fn new(raw: Vec<u8>) -> Self {
        Self { raw }
    }
}

impl Serialize for RawExtension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !serializer.is_human_readable() {
            return serializer.serialize_bytes(&self.raw);
        }
        if self.raw.is_empty() {
            return serializer.serialize_none();
        }
        let value: &RawValue = serde_json::from_slice(&self.raw)
            .map_err(|e| ser::Error::custom(format!("raw extension is not valid JSON: {e}")))?;
        value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RawExtension {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if !deserializer.is_human_readable() {
            let raw = serde_bytes::ByteBuf::deserialize(deserializer)?;
            return Ok(Self::new(raw.into_vec()));
        }
        Ok(Option::<Box<RawValue>>::deserialize(deserializer)?
            .map_or_else(Self::default, |value| Self::new(value.get().as_bytes().to_vec())))
    }
}

impl Fill for RawExtension {
    fn fill(&mut self, g: &mut Generator<'_, '_>) -> GenResult<()> {
        let max = g.limits().max_string_len;
        self.raw = g.cursor().get_bytes(max)?;
        Ok(())
    }
}

/// An object of a kind the catalog does not know, kept as raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unknown {
    /// Encoded object.
    #[serde(with = "serde_bytes")]
    pub raw: Vec<u8>,
    /// Content encoding of `raw`.
    pub content_encoding: String,
    /// Content type of `raw`.
    pub content_type: String,
}

impl_fill!(Unknown {
    raw,
    content_encoding,
    content_type
});

/// A polymorphic object slot, such as the payload of a watch event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddedObject(pub Option<Unknown>);

impl Fill for EmbeddedObject {
    fn fill(&mut self, g: &mut Generator<'_, '_>) -> GenResult<()> {
        g.generate(&mut self.0)
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
    fn test_raw_extension_inlines_json() {
        let ext = RawExtension::new(br#"{"kind":"Status"}"#.to_vec());
        let json = serde_json::to_string(&ext).unwrap();
        assert_eq!(json, r#"{"kind":"Status"}"#);
        let back: RawExtension = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ext);
    }

    #[test]
    fn test_raw_extension_keeps_key_order() {
        let ext = RawExtension::new(br#"{"z":1,"a":[true,null]}"#.to_vec());
        let json = serde_json::to_vec(&ext).unwrap();
        let back: RawExtension = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, ext);
    }

    #[test]
    fn test_empty_raw_extension_is_null() {
        let json = serde_json::to_string(&RawExtension::default()).unwrap();
        assert_eq!(json, "null");
        let back: RawExtension = serde_json::from_str("null").unwrap();
        assert!(back.raw.is_empty());
    }

    #[test]
    fn test_non_json_raw_extension_fails_to_encode() {
        let ext = RawExtension::new(vec![0xFF, 0x00]);
        assert!(serde_json::to_string(&ext).is_err());
    }
}
