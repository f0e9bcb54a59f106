//! Binary codec.
//!
//! Layout: the 4-byte magic `rtb\0` followed by a bincode [`Envelope`]
//! carrying the type tag, a content type and the bincode encoding of the
//! object itself.

use super::{
    check_wire_kind, to_external_form, wire_kind, Codec, CodecError, CodecOperation, CodecResult,
};
use crate::catalog::Scheme;
use crate::model::TypeMeta;
use crate::Object;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;

/// Leading bytes of every binary encoding.
pub const MAGIC: [u8; 4] = *b"rtb\0";

/// Content type written into every envelope.
pub const CONTENT_TYPE: &str = "application/vnd.schema-roundtrip.bincode";

// Fixed-size integers keep encodings independent of the values involved.
fn config() -> impl bincode::config::Config {
    bincode::config::standard().with_fixed_int_encoding()
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    type_meta: TypeMeta,
    content_type: String,
    #[serde(with = "serde_bytes")]
    raw: Vec<u8>,
}

fn encode_value<T: Serialize>(value: &T, operation: CodecOperation) -> CodecResult<Vec<u8>> {
    bincode::serde::encode_to_vec(value, config())
        .map_err(|e| CodecError::encode(e.to_string(), operation))
}

fn decode_value<T: DeserializeOwned>(bytes: &[u8], operation: CodecOperation) -> CodecResult<T> {
    let (value, read) = bincode::serde::decode_from_slice(bytes, config())
        .map_err(|e| CodecError::decode(e.to_string(), operation))?;
    if read != bytes.len() {
        return Err(CodecError::decode(
            format!("{} trailing bytes", bytes.len() - read),
            operation,
        ));
    }
    Ok(value)
}

/// Bincode codec wrapped in a tagged envelope.
#[derive(Debug, Clone)]
pub struct BinaryCodec {
    scheme: Arc<Scheme>,
}

impl BinaryCodec {
    /// Creates a binary codec resolving kinds through `scheme`.
    #[must_use]
    pub fn new(scheme: Arc<Scheme>) -> Self {
        Self { scheme }
    }

    fn read<T: Object>(&self, data: &[u8], operation: CodecOperation) -> CodecResult<T> {
        let body = data
            .strip_prefix(&MAGIC)
            .ok_or_else(|| CodecError::decode("missing magic prefix", CodecOperation::Envelope))?;
        let envelope: Envelope = decode_value(body, CodecOperation::Envelope)?;
        if envelope.content_type != CONTENT_TYPE {
            return Err(CodecError::decode(
                format!("unexpected content type {:?}", envelope.content_type),
                CodecOperation::Envelope,
            ));
        }
        let object: T = decode_value(&envelope.raw, operation)?;
        if *object.type_meta() != envelope.type_meta {
            return Err(CodecError::KindMismatch {
                expected: T::type_name(),
                found: format!(
                    "{}/{}",
                    envelope.type_meta.api_version, envelope.type_meta.kind
                ),
            });
        }
        check_wire_kind(&self.scheme, &object)?;
        Ok(object)
    }
}

impl Codec for BinaryCodec {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn encode<T: Object>(&self, object: &T) -> CodecResult<Vec<u8>> {
        let tag = wire_kind(&self.scheme, object)?;
        let mut stamped = object.clone();
        *stamped.type_meta_mut() = tag.clone();
        let envelope = Envelope {
            type_meta: tag,
            content_type: CONTENT_TYPE.to_owned(),
            raw: encode_value(&stamped, CodecOperation::Encode)?,
        };
        let mut out = MAGIC.to_vec();
        out.extend(encode_value(&envelope, CodecOperation::Envelope)?);
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
    use crate::model::{default_scheme, Cell, Table, TableRow, Time};

    fn codec() -> BinaryCodec {
        BinaryCodec::new(Arc::new(default_scheme()))
    }

    fn table() -> Table {
        Table {
            rows: vec![TableRow {
                cells: vec![Cell::Int(3), Cell::String("x".to_owned())],
                ..TableRow::default()
            }],
            ..Table::default()
        }
    }

    #[test]
    fn test_encoding_starts_with_magic() {
        let data = codec().encode(&table()).unwrap();
        assert_eq!(data[..4], MAGIC);
    }

    #[test]
    fn test_decode_recovers_object() {
        let codec = codec();
        let original = table();
        let data = codec.encode(&original).unwrap();
        let decoded: Table = codec.decode(&data).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_binary_keeps_subsecond_time() {
        use crate::model::{Condition, Service};
        let codec = codec();
        let mut service = Service::default();
        service.status.conditions.push(Condition {
            last_transition_time: Time::from_unix(5, 7).unwrap(),
            ..Condition::default()
        });
        let data = codec.encode(&service).unwrap();
        let decoded: Service = codec.decode(&data).unwrap();
        assert_eq!(decoded.status, service.status);
    }

    #[test]
    fn test_missing_magic_is_rejected() {
        let err = codec().decode::<Table>(b"{}").unwrap_err();
        assert!(matches!(
            err,
            CodecError::DecodeError {
                operation: CodecOperation::Envelope,
                ..
            }
        ));
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let codec = codec();
        let mut data = codec.encode(&table()).unwrap();
        data.push(0);
        assert!(codec.decode::<Table>(&data).is_err());
    }
}
