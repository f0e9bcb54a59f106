//! Customizers for opaque payloads and quantities.

use super::Customizers;
use crate::codec::{Codec, JsonCodec};
use crate::generate::{GenResult, Generator};
use crate::model::{ApiGroup, EmbeddedObject, Quantity, RawExtension, Status, Unknown};
use crate::Object;

/// Upper bound (exclusive) on generated quantity magnitudes.
pub const QUANTITY_BOUND: usize = 1000;

/// Payload of the stand-in object placed in every embedded object slot.
pub const EMBEDDED_RAW: &[u8] =
    br#"{"apiVersion":"unknown.group/unknown","kind":"Something","someKey":"someValue"}"#;

/// Content type of [`EMBEDDED_RAW`].
pub const EMBEDDED_CONTENT_TYPE: &str = "application/json";

pub(super) fn register(customizers: &mut Customizers, reference: JsonCodec) {
    customizers.register::<Quantity, _>(quantity);
    customizers.register::<EmbeddedObject, _>(embedded_object);
    customizers.register::<RawExtension, _>(move |r, g| raw_extension(r, g, &reference));
}

/// A small integer quantity, which always survives the textual form.
pub fn quantity(q: &mut Quantity, g: &mut Generator<'_, '_>) -> GenResult<()> {
    *q = Quantity::from_int((g.cursor().get_int()? % QUANTITY_BOUND) as i64);
    Ok(())
}

/// The fixed stand-in object. Consumes no input.
pub fn embedded_object(o: &mut EmbeddedObject, _g: &mut Generator<'_, '_>) -> GenResult<()> {
    *o = EmbeddedObject(Some(Unknown {
        raw: EMBEDDED_RAW.to_vec(),
        content_encoding: String::new(),
        content_type: EMBEDDED_CONTENT_TYPE.to_owned(),
    }));
    Ok(())
}

/// A generated [`Status`] or [`ApiGroup`] tagged with its preferred
/// external kind, encoded by `reference` with trailing newlines removed.
pub fn raw_extension(
    r: &mut RawExtension,
    g: &mut Generator<'_, '_>,
    reference: &JsonCodec,
) -> GenResult<()> {
    let mut raw = if g.cursor().get_int()? % 2 == 0 {
        encode_tagged::<Status>(g, reference)?
    } else {
        encode_tagged::<ApiGroup>(g, reference)?
    };
    while raw.last() == Some(&b'\n') {
        raw.pop();
    }
    r.raw = raw;
    Ok(())
}

fn encode_tagged<T: Object>(g: &mut Generator<'_, '_>, reference: &JsonCodec) -> GenResult<Vec<u8>> {
    let mut object = T::default();
    g.generate(&mut object)?;
    if let Some(gvk) = reference.scheme().external_kind_for::<T>() {
        *object.type_meta_mut() = gvk.to_type_meta();
    }
    Ok(reference.encode(&object)?)
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::super::test_support::{bytes, defaults, generate};
    use super::*;
    use crate::catalog::Scheme;
    use crate::codec::CodecError;
    use crate::generate::GenError;
    use crate::model::TypeMeta;
    use std::sync::Arc;

    #[test]
    fn test_quantity_is_small_integer() {
        let customizers = defaults();
        for seed in 0..16 {
            let q: Quantity = generate(&customizers, &bytes(seed)).unwrap();
            assert_eq!(q.scale(), 0);
            assert!((0..QUANTITY_BOUND as i64).contains(&q.value()));
            assert_eq!(q.to_string().parse::<Quantity>().unwrap(), q);
        }
    }

    #[test]
    fn test_embedded_object_is_fixed() {
        let customizers = defaults();
        let o: EmbeddedObject = generate(&customizers, &[]).unwrap();
        let unknown = o.0.unwrap();
        assert_eq!(unknown.raw, EMBEDDED_RAW);
        assert_eq!(unknown.content_type, "application/json");
        assert!(unknown.content_encoding.is_empty());
    }

    #[test]
    fn test_raw_extension_is_tagged_json_without_newline() {
        let customizers = defaults();
        let mut seen = 0;
        for seed in 0..16 {
            let Ok(r) = generate::<RawExtension>(&customizers, &bytes(seed)) else {
                continue;
            };
            seen += 1;
            assert_ne!(r.raw.last(), Some(&b'\n'));
            let value: serde_json::Value = serde_json::from_slice(&r.raw).unwrap();
            let kind = value["typeMeta"]["kind"].as_str().unwrap();
            assert!(kind == "Status" || kind == "APIGroup", "{kind}");
        }
        assert!(seen > 0);
    }

    #[test]
    fn test_raw_extension_reports_reference_codec_failure() {
        let mut customizers = Customizers::new();
        customizers.register::<TypeMeta, _>(super::super::meta::type_meta);
        register(&mut customizers, JsonCodec::new(Arc::new(Scheme::new())));
        let err = generate::<RawExtension>(&customizers, &bytes(0)).unwrap_err();
        assert!(matches!(
            err,
            GenError::Codec(CodecError::NotRegistered { .. })
        ));
    }
}
