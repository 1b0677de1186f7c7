//! The `Message` trait implemented by every type that crosses the bridge.

use crate::error::DecodeError;
use crate::reader::{Field, Reader};
use crate::writer::Writer;

/// A type with a wire encoding.
///
/// Implementors write their set fields in `encode_raw` and consume known
/// field numbers in `merge_field`. Anything not matched should go to
/// [`Reader::skip`], which is what the default implementation does.
pub trait Message: Default {
    /// Append this message's fields to `writer`.
    fn encode_raw(&self, writer: &mut Writer);

    /// Consume one field. Unknown fields must be skipped, never rejected.
    fn merge_field(&mut self, field: Field, reader: &mut Reader<'_>) -> Result<(), DecodeError> {
        reader.skip(field)
    }

    /// Read fields until the reader is exhausted.
    fn merge(&mut self, reader: &mut Reader<'_>) -> Result<(), DecodeError> {
        while let Some(field) = reader.next_field()? {
            self.merge_field(field, reader)?;
        }
        Ok(())
    }

    fn encode_to_vec(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        self.encode_raw(&mut writer);
        writer.into_inner()
    }

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut message = Self::default();
        message.merge(&mut Reader::new(buf))?;
        Ok(message)
    }
}

/// The empty message, for calls that take or return nothing.
impl Message for () {
    fn encode_raw(&self, _writer: &mut Writer) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Inner {
        label: String,
        weight: f64,
    }

    impl Message for Inner {
        fn encode_raw(&self, w: &mut Writer) {
            if !self.label.is_empty() {
                w.write_string(1, &self.label);
            }
            if self.weight != 0.0 {
                w.write_double(2, self.weight);
            }
        }

        fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
            match field.number {
                1 => self.label = r.read_string(field)?.to_owned(),
                2 => self.weight = r.read_double(field)?,
                _ => r.skip(field)?,
            }
            Ok(())
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Outer {
        id: u64,
        delta: i32,
        flag: bool,
        name: Option<String>,
        blob: Vec<u8>,
        inner: Option<Inner>,
        items: Vec<Inner>,
        ratio: f32,
    }

    impl Message for Outer {
        fn encode_raw(&self, w: &mut Writer) {
            if self.id != 0 {
                w.write_uint64(1, self.id);
            }
            if self.delta != 0 {
                w.write_sint32(2, self.delta);
            }
            if self.flag {
                w.write_bool(3, self.flag);
            }
            if let Some(name) = &self.name {
                w.write_string(4, name);
            }
            if !self.blob.is_empty() {
                w.write_bytes(5, &self.blob);
            }
            if let Some(inner) = &self.inner {
                w.write_message(6, inner);
            }
            w.write_repeated_message(7, &self.items);
            if self.ratio != 0.0 {
                w.write_float(8, self.ratio);
            }
        }

        fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
            match field.number {
                1 => self.id = r.read_uint64(field)?,
                2 => self.delta = r.read_sint32(field)?,
                3 => self.flag = r.read_bool(field)?,
                4 => self.name = Some(r.read_string(field)?.to_owned()),
                5 => self.blob = r.read_bytes(field)?.to_vec(),
                6 => self.inner = Some(r.read_message(field)?),
                7 => self.items.push(r.read_message(field)?),
                8 => self.ratio = r.read_float(field)?,
                _ => r.skip(field)?,
            }
            Ok(())
        }
    }

    /// Same as `Outer` but only knows fields 1 and 4.
    #[derive(Debug, Default, PartialEq)]
    struct OuterV0 {
        id: u64,
        name: Option<String>,
    }

    impl Message for OuterV0 {
        fn encode_raw(&self, w: &mut Writer) {
            if self.id != 0 {
                w.write_uint64(1, self.id);
            }
            if let Some(name) = &self.name {
                w.write_string(4, name);
            }
        }

        fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
            match field.number {
                1 => self.id = r.read_uint64(field)?,
                4 => self.name = Some(r.read_string(field)?.to_owned()),
                _ => r.skip(field)?,
            }
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct Nest {
        child: Option<Box<Nest>>,
    }

    impl Message for Nest {
        fn encode_raw(&self, w: &mut Writer) {
            if let Some(child) = &self.child {
                w.write_message(1, child.as_ref());
            }
        }

        fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
            match field.number {
                1 => self.child = Some(Box::new(r.read_message(field)?)),
                _ => r.skip(field)?,
            }
            Ok(())
        }
    }

    fn sample() -> Outer {
        Outer {
            id: 300,
            delta: -7,
            flag: true,
            name: Some("impression".into()),
            blob: vec![0, 1, 2, 255],
            inner: Some(Inner {
                label: "nested".into(),
                weight: 0.5,
            }),
            items: vec![
                Inner {
                    label: "a".into(),
                    weight: 1.0,
                },
                Inner::default(),
                Inner {
                    label: "c".into(),
                    weight: -3.25,
                },
            ],
            ratio: 1.5,
        }
    }

    #[test]
    fn test_roundtrip_all_field_kinds() {
        let original = sample();
        let decoded = Outer::decode(&original.encode_to_vec()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_unset_optional_stays_unset() {
        let original = Outer {
            id: 1,
            ..Default::default()
        };
        let decoded = Outer::decode(&original.encode_to_vec()).unwrap();
        assert_eq!(decoded.name, None);
        assert_eq!(decoded.inner, None);
        assert!(decoded.items.is_empty());
    }

    #[test]
    fn test_present_but_empty_string_is_set() {
        let original = Outer {
            name: Some(String::new()),
            ..Default::default()
        };
        let decoded = Outer::decode(&original.encode_to_vec()).unwrap();
        assert_eq!(decoded.name, Some(String::new()));
    }

    #[test]
    fn test_repeated_preserves_order_and_empty_elements() {
        let decoded = Outer::decode(&sample().encode_to_vec()).unwrap();
        let labels: Vec<_> = decoded.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "", "c"]);
    }

    #[test]
    fn test_older_reader_skips_newer_fields() {
        let decoded = OuterV0::decode(&sample().encode_to_vec()).unwrap();
        assert_eq!(
            decoded,
            OuterV0 {
                id: 300,
                name: Some("impression".into()),
            }
        );
    }

    #[test]
    fn test_newer_reader_accepts_older_message() {
        let old = OuterV0 {
            id: 9,
            name: None,
        };
        let decoded = Outer::decode(&old.encode_to_vec()).unwrap();
        assert_eq!(decoded.id, 9);
        assert_eq!(decoded.inner, None);
    }

    #[test]
    fn test_empty_buffer_decodes_to_default() {
        assert_eq!(Outer::decode(&[]).unwrap(), Outer::default());
        assert!(<()>::decode(&[0x08, 0x01]).is_ok());
    }

    #[test]
    fn test_truncated_message_fails() {
        let bytes = sample().encode_to_vec();
        assert!(Outer::decode(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_recursion_limit() {
        let mut root = Nest::default();
        for _ in 0..(crate::MAX_RECURSION_DEPTH + 2) {
            root = Nest {
                child: Some(Box::new(root)),
            };
        }
        let bytes = root.encode_to_vec();
        assert!(matches!(
            Nest::decode(&bytes),
            Err(DecodeError::RecursionLimit(_))
        ));
    }

    fn inner_strategy() -> impl Strategy<Value = Inner> {
        (".{0,16}", any::<f64>().prop_filter("not nan", |f| !f.is_nan()))
            .prop_map(|(label, weight)| Inner { label, weight })
    }

    proptest! {
        #[test]
        fn prop_outer_roundtrip(
            id: u64,
            delta: i32,
            flag: bool,
            name in proptest::option::of(".{0,24}"),
            blob in proptest::collection::vec(any::<u8>(), 0..64),
            inner in proptest::option::of(inner_strategy()),
            items in proptest::collection::vec(inner_strategy(), 0..8),
        ) {
            let original = Outer { id, delta, flag, name, blob, inner, items, ratio: 0.0 };
            let decoded = Outer::decode(&original.encode_to_vec()).unwrap();
            prop_assert_eq!(decoded, original);
        }

        #[test]
        fn prop_decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
            let _ = Outer::decode(&bytes);
        }
    }
}
