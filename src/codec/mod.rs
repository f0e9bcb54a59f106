//! Codecs under test.
//!
//! A codec turns a registered [`Object`] into bytes and back. The crate ships
//! a textual codec ([`JsonCodec`]) and a binary codec ([`BinaryCodec`]);
//! both resolve type identity through a shared [`Scheme`]:
//!
//! - **encode** writes the object's own tag, which must name an external
//!   kind of its type. A blank tag stays blank for types registered both
//!   internally and externally, since the decoding side already knows the
//!   type; other types get their preferred external kind. A type with no
//!   external kind yields [`CodecError::NotRegistered`].
//! - **decode** checks the wire tag against the requested type and returns
//!   the object as written, tag included.
//! - **decode_into** does the same, but an untagged dual-representation
//!   object comes back carrying its preferred external kind.
//!
//! [`Codec`] has generic methods, so the harness holds codecs through the
//! [`CodecHandle`] enum rather than a trait object.

mod binary;
mod json;

pub use binary::BinaryCodec;
pub use json::JsonCodec;

use crate::catalog::{GroupVersionKind, Scheme};
use crate::model::TypeMeta;
use crate::Object;
use std::any::TypeId;
use std::fmt::{self, Write as _};

/// What a codec was doing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecOperation {
    /// Encoding an object.
    Encode,
    /// Decoding into a new object.
    Decode,
    /// Decoding into an existing object.
    DecodeInto,
    /// Reading or writing the binary envelope.
    Envelope,
}

impl fmt::Display for CodecOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode => write!(f, "encoding object"),
            Self::Decode => write!(f, "decoding object"),
            Self::DecodeInto => write!(f, "decoding into existing object"),
            Self::Envelope => write!(f, "processing envelope"),
        }
    }
}

/// Errors raised by codecs.
///
/// Messages from `serde_json` and `bincode` are kept as strings since
/// neither exposes structured failure reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecError {
    /// The codec cannot represent this type. Not a defect.
    NotRegistered {
        /// Rust-side name of the type.
        type_name: &'static str,
    },
    /// Serialization or envelope writing failed.
    EncodeError {
        /// Underlying serializer message.
        message: String,
        /// Stage that failed.
        operation: CodecOperation,
    },
    /// The bytes could not be parsed back into the type.
    DecodeError {
        /// Underlying deserializer message.
        message: String,
        /// Stage that failed.
        operation: CodecOperation,
    },
    /// The type tag does not belong to the requested type.
    KindMismatch {
        /// Type the caller asked for.
        expected: &'static str,
        /// Tag found, rendered as `apiVersion/kind`.
        found: String,
    },
}

impl CodecError {
    /// Wraps a serializer failure at `operation`.
    pub fn encode(message: impl Into<String>, operation: CodecOperation) -> Self {
        Self::EncodeError {
            message: message.into(),
            operation,
        }
    }

    /// Wraps a deserializer failure at `operation`.
    pub fn decode(message: impl Into<String>, operation: CodecOperation) -> Self {
        Self::DecodeError {
            message: message.into(),
            operation,
        }
    }

    /// True for the "type unsupported by this codec" signal.
    #[must_use]
    pub const fn is_not_registered(&self) -> bool {
        matches!(self, Self::NotRegistered { .. })
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRegistered { type_name } => {
                write!(f, "no external kind registered for type {type_name}")
            },
            Self::EncodeError { message, operation } => {
                write!(f, "encoding failed while {operation}: {message}")
            },
            Self::DecodeError { message, operation } => {
                write!(f, "decoding failed while {operation}: {message}")
            },
            Self::KindMismatch { expected, found } => {
                write!(f, "type tag {found:?} does not identify {expected}")
            },
        }
    }
}

impl std::error::Error for CodecError {}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// A serialization format under test.
pub trait Codec: Send + Sync {
    /// Short name used in reports.
    fn name(&self) -> &'static str;

    /// Encodes `object`. Must not modify it.
    fn encode<T: Object>(&self, object: &T) -> CodecResult<Vec<u8>>;

    /// Decodes a new object from `data`.
    fn decode<T: Object>(&self, data: &[u8]) -> CodecResult<T>;

    /// Decodes `data` into an existing object.
    fn decode_into<T: Object>(&self, data: &[u8], target: &mut T) -> CodecResult<()>;
}

/// Which built-in codec to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CodecKind {
    /// [`JsonCodec`].
    Json,
    /// [`BinaryCodec`].
    Binary,
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Static dispatch over the built-in codecs.
#[derive(Debug, Clone)]
pub enum CodecHandle {
    /// Textual codec.
    Json(JsonCodec),
    /// Binary codec.
    Binary(BinaryCodec),
}

impl CodecHandle {
    /// Builds the codec of the given kind over `scheme`.
    #[must_use]
    pub fn new(kind: CodecKind, scheme: std::sync::Arc<Scheme>) -> Self {
        match kind {
            CodecKind::Json => Self::Json(JsonCodec::new(scheme)),
            CodecKind::Binary => Self::Binary(BinaryCodec::new(scheme)),
        }
    }
}

impl Codec for CodecHandle {
    fn name(&self) -> &'static str {
        match self {
            Self::Json(c) => c.name(),
            Self::Binary(c) => c.name(),
        }
    }

    fn encode<T: Object>(&self, object: &T) -> CodecResult<Vec<u8>> {
        match self {
            Self::Json(c) => c.encode(object),
            Self::Binary(c) => c.encode(object),
        }
    }

    fn decode<T: Object>(&self, data: &[u8]) -> CodecResult<T> {
        match self {
            Self::Json(c) => c.decode(data),
            Self::Binary(c) => c.decode(data),
        }
    }

    fn decode_into<T: Object>(&self, data: &[u8], target: &mut T) -> CodecResult<()> {
        match self {
            Self::Json(c) => c.decode_into(data, target),
            Self::Binary(c) => c.decode_into(data, target),
        }
    }
}

/// Picks the tag to write for `object`.
///
/// A set tag must name an external kind of `T` and is written unchanged. A
/// blank tag stays blank for dual-representation types and becomes the
/// preferred external kind for everything else.
fn wire_kind<T: Object>(scheme: &Scheme, object: &T) -> CodecResult<TypeMeta> {
    let not_registered = CodecError::NotRegistered {
        type_name: T::type_name(),
    };
    if scheme.kinds_for::<T>().is_empty() {
        return Err(not_registered);
    }
    let meta = object.type_meta();
    if !meta.is_empty() {
        check_tag::<T>(scheme, meta)?;
        return Ok(meta.clone());
    }
    if scheme.is_internal_and_external::<T>() {
        return Ok(TypeMeta::default());
    }
    scheme
        .external_kind_for::<T>()
        .map(GroupVersionKind::to_type_meta)
        .ok_or(not_registered)
}

/// Checks a decoded tag: blank is accepted only for dual-representation
/// types, anything else must name an external kind of `T`.
fn check_wire_kind<T: Object>(scheme: &Scheme, object: &T) -> CodecResult<()> {
    let meta = object.type_meta();
    if meta.is_empty() && scheme.is_internal_and_external::<T>() {
        return Ok(());
    }
    check_tag::<T>(scheme, meta)
}

fn check_tag<T: Object>(scheme: &Scheme, meta: &TypeMeta) -> CodecResult<()> {
    let gvk = GroupVersionKind::from_type_meta(meta);
    if meta.kind.is_empty()
        || gvk.is_internal()
        || scheme.type_id_of(&gvk) != Some(TypeId::of::<T>())
    {
        return Err(CodecError::KindMismatch {
            expected: T::type_name(),
            found: format!("{}/{}", meta.api_version, meta.kind),
        });
    }
    Ok(())
}

/// Gives an untagged object decoded in place its preferred external kind.
fn to_external_form<T: Object>(scheme: &Scheme, object: &mut T) {
    if object.type_meta().is_empty() {
        if let Some(gvk) = scheme.external_kind_for::<T>() {
            *object.type_meta_mut() = gvk.to_type_meta();
        }
    }
}

/// Renders encoded bytes for a report: text that looks like JSON verbatim,
/// anything else as a hex dump.
#[must_use]
pub fn data_as_string(data: &[u8]) -> String {
    if data.first() == Some(&b'{') {
        return String::from_utf8_lossy(data).into_owned();
    }
    let mut out = String::from("\n");
    for (line, chunk) in data.chunks(16).enumerate() {
        let bytes: Vec<String> = chunk.iter().map(|b| hex::encode([*b])).collect();
        let ascii: String = chunk
            .iter()
            .map(|b| {
                if b.is_ascii_graphic() || *b == b' ' {
                    char::from(*b)
                } else {
                    '.'
                }
            })
            .collect();
        let _ = writeln!(out, "{:08x}  {:<47}  |{}|", line * 16, bytes.join(" "), ascii);
    }
    out
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
    fn test_data_as_string_keeps_json() {
        assert_eq!(data_as_string(b"{\"a\":1}\n"), "{\"a\":1}\n");
    }

    #[test]
    fn test_data_as_string_dumps_binary() {
        let dump = data_as_string(b"rtb\0\x01\x02");
        assert!(dump.starts_with('\n'));
        assert!(dump.contains("00000000  72 74 62 00 01 02"));
        assert!(dump.contains("|rtb...|"));
    }

    #[test]
    fn test_data_as_string_wraps_lines() {
        let dump = data_as_string(&[0u8; 20]);
        assert!(dump.contains("00000010  00 00 00 00"));
    }

    #[test]
    fn test_codec_error_display() {
        let err = CodecError::encode("boom", CodecOperation::Encode);
        assert!(err.to_string().contains("encoding failed"));
        let err = CodecError::decode("boom", CodecOperation::DecodeInto);
        assert!(err.to_string().contains("existing object"));
        let err = CodecError::NotRegistered { type_name: "Thing" };
        assert!(err.is_not_registered());
        assert!(err.to_string().contains("Thing"));
    }

    #[test]
    fn test_codec_kind_display() {
        assert_eq!(CodecKind::Json.to_string(), "json");
        assert_eq!(CodecKind::Binary.to_string(), "binary");
    }
}
