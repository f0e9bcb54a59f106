//! Textual codec.

use super::{
    check_wire_kind, to_external_form, wire_kind, Codec, CodecError, CodecOperation, CodecResult,
};
use crate::catalog::Scheme;
use crate::Object;
use std::sync::Arc;

/// JSON codec. Every encoding ends with a newline.
#[derive(Debug, Clone)]
pub struct JsonCodec {
    scheme: Arc<Scheme>,
}

impl JsonCodec {
    /// Creates a JSON codec resolving kinds through `scheme`.
    #[must_use]
    pub fn new(scheme: Arc<Scheme>) -> Self {
        Self { scheme }
    }

    /// The scheme kinds are resolved through.
    #[must_use]
    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    fn read<T: Object>(&self, data: &[u8], operation: CodecOperation) -> CodecResult<T> {
        let object: T = serde_json::from_slice(data)
            .map_err(|e| CodecError::decode(e.to_string(), operation))?;
        check_wire_kind(&self.scheme, &object)?;
        Ok(object)
    }
}

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode<T: Object>(&self, object: &T) -> CodecResult<Vec<u8>> {
        let tag = wire_kind(&self.scheme, object)?;
        let mut stamped = object.clone();
        *stamped.type_meta_mut() = tag;
        let mut out = serde_json::to_vec(&stamped)
            .map_err(|e| CodecError::encode(e.to_string(), CodecOperation::Encode))?;
        out.push(b'\n');
        Ok(out)
    }

    fn decode<T: Object>(&self, data: &[u8]) -> CodecResult<T> {
        self.read(data, CodecOperation::Decode)
    }

    fn decode_into<T: Object>(&self, data: &[u8], target: &mut T) -> CodecResult<()> {
        let mut object = self.read(data, CodecOperation::DecodeInto)?;
        to_external_form(&self.scheme, &mut object);
        *target = object;
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
    use crate::model::{default_scheme, GetOptions, Status, Table, TypeMeta};

    fn codec() -> JsonCodec {
        JsonCodec::new(Arc::new(default_scheme()))
    }

    #[test]
    fn test_encode_stamps_external_only_kind_and_newline() {
        let options = GetOptions::default();
        let data = codec().encode(&options).unwrap();
        assert_eq!(data.last(), Some(&b'\n'));
        let text = String::from_utf8(data).unwrap();
        assert!(text.starts_with(r#"{"typeMeta":{"apiVersion":"meta.k8s.io/v1","kind":"GetOptions"}"#));
        assert!(options.type_meta.is_empty());
    }

    #[test]
    fn test_untagged_dual_kind_is_written_untagged() {
        let status = Status {
            code: 404,
            ..Status::default()
        };
        let text = String::from_utf8(codec().encode(&status).unwrap()).unwrap();
        assert!(text.starts_with(r#"{"typeMeta":{"apiVersion":"","kind":""}"#), "{text}");
    }

    #[test]
    fn test_non_preferred_version_reaches_the_wire() {
        let codec = codec();
        let table = Table {
            type_meta: TypeMeta::new("meta.k8s.io/v1beta1", "Table"),
            ..Table::default()
        };
        let data = codec.encode(&table).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&data).unwrap();
        assert_eq!(value["typeMeta"]["apiVersion"], "meta.k8s.io/v1beta1");

        let decoded: Table = codec.decode(&data).unwrap();
        assert_eq!(decoded, table);
        let mut into = Table::default();
        codec.decode_into(&data, &mut into).unwrap();
        assert_eq!(into.type_meta.api_version, "meta.k8s.io/v1beta1");
    }

    #[test]
    fn test_decode_of_dual_kind_is_untagged() {
        let codec = codec();
        let data = codec.encode(&Status::default()).unwrap();
        let decoded: Status = codec.decode(&data).unwrap();
        assert!(decoded.type_meta.is_empty());

        let mut into = Status::default();
        codec.decode_into(&data, &mut into).unwrap();
        assert_eq!(into.type_meta, TypeMeta::new("meta.k8s.io/v1", "Status"));
    }

    #[test]
    fn test_decode_of_external_only_kind_keeps_tag() {
        let codec = codec();
        let data = codec.encode(&GetOptions::default()).unwrap();
        let decoded: GetOptions = codec.decode(&data).unwrap();
        assert_eq!(decoded.type_meta, TypeMeta::new("meta.k8s.io/v1", "GetOptions"));
    }

    #[test]
    fn test_decode_rejects_wrong_kind() {
        let codec = codec();
        let data = codec.encode(&GetOptions::default()).unwrap();
        let err = codec.decode::<Status>(&data);
        assert!(err.is_err());
    }

    #[test]
    fn test_encode_rejects_foreign_tag() {
        let status = Status {
            type_meta: TypeMeta::new("meta.k8s.io/v1", "APIGroup"),
            ..Status::default()
        };
        let err = codec().encode(&status).unwrap_err();
        assert!(matches!(err, CodecError::KindMismatch { .. }));
    }

    #[test]
    fn test_unregistered_type_is_reported() {
        let empty = JsonCodec::new(Arc::new(Scheme::new()));
        let err = empty.encode(&Status::default()).unwrap_err();
        assert!(err.is_not_registered());
    }
}
