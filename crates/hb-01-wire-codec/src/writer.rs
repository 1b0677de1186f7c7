//! Message writer.

use crate::message::Message;
use crate::wire::{encode_varint, make_tag, zigzag_encode32, zigzag_encode64, WireType};

/// Appends encoded fields to a byte buffer.
///
/// Nested messages are encoded into scratch buffers so their length prefix
/// can be written before the body. Scratch buffers are kept on a free-list
/// and reused for the lifetime of the writer.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
    scratch: Vec<Vec<u8>>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write into an existing (typically pooled) buffer. Its contents are kept.
    pub fn with_buffer(buf: Vec<u8>) -> Self {
        Self {
            buf,
            scratch: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    #[inline]
    fn write_tag(&mut self, field_number: u32, wire_type: WireType) {
        encode_varint(u64::from(make_tag(field_number, wire_type)), &mut self.buf);
    }

    pub fn write_uint32(&mut self, field_number: u32, value: u32) {
        self.write_tag(field_number, WireType::Varint);
        encode_varint(u64::from(value), &mut self.buf);
    }

    pub fn write_uint64(&mut self, field_number: u32, value: u64) {
        self.write_tag(field_number, WireType::Varint);
        encode_varint(value, &mut self.buf);
    }

    /// Plain varint; negative values sign-extend to ten bytes.
    pub fn write_int32(&mut self, field_number: u32, value: i32) {
        self.write_tag(field_number, WireType::Varint);
        encode_varint(i64::from(value) as u64, &mut self.buf);
    }

    pub fn write_int64(&mut self, field_number: u32, value: i64) {
        self.write_tag(field_number, WireType::Varint);
        encode_varint(value as u64, &mut self.buf);
    }

    pub fn write_sint32(&mut self, field_number: u32, value: i32) {
        self.write_tag(field_number, WireType::Varint);
        encode_varint(u64::from(zigzag_encode32(value)), &mut self.buf);
    }

    pub fn write_sint64(&mut self, field_number: u32, value: i64) {
        self.write_tag(field_number, WireType::Varint);
        encode_varint(zigzag_encode64(value), &mut self.buf);
    }

    pub fn write_bool(&mut self, field_number: u32, value: bool) {
        self.write_tag(field_number, WireType::Varint);
        self.buf.push(u8::from(value));
    }

    pub fn write_fixed32(&mut self, field_number: u32, value: u32) {
        self.write_tag(field_number, WireType::Fixed32);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, field_number: u32, value: u64) {
        self.write_tag(field_number, WireType::Fixed64);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_float(&mut self, field_number: u32, value: f32) {
        self.write_tag(field_number, WireType::Fixed32);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_double(&mut self, field_number: u32, value: f64) {
        self.write_tag(field_number, WireType::Fixed64);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, field_number: u32, value: &[u8]) {
        self.write_tag(field_number, WireType::LengthDelimited);
        encode_varint(value.len() as u64, &mut self.buf);
        self.buf.extend_from_slice(value);
    }

    pub fn write_string(&mut self, field_number: u32, value: &str) {
        self.write_bytes(field_number, value.as_bytes());
    }

    /// Write a nested message as a length-delimited field.
    pub fn write_message<M: Message>(&mut self, field_number: u32, message: &M) {
        // Park the outer buffer in `nested`, encode the child into the
        // scratch buffer, then swap back so `nested` holds the child body.
        let mut nested = self.scratch.pop().unwrap_or_default();
        std::mem::swap(&mut self.buf, &mut nested);
        message.encode_raw(self);
        std::mem::swap(&mut self.buf, &mut nested);

        self.write_bytes(field_number, &nested);

        nested.clear();
        self.scratch.push(nested);
    }

    /// Write each element of a repeated message field, in order.
    pub fn write_repeated_message<M: Message>(&mut self, field_number: u32, messages: &[M]) {
        for message in messages {
            self.write_message(field_number, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_field_layout() {
        let mut w = Writer::new();
        w.write_string(1, "hi");
        assert_eq!(w.as_slice(), &[0x0a, 0x02, b'h', b'i']);
    }

    #[test]
    fn test_negative_int32_sign_extends() {
        let mut w = Writer::new();
        w.write_int32(1, -1);
        // tag + 10 varint bytes
        assert_eq!(w.len(), 11);
    }

    #[test]
    fn test_sint32_is_compact_for_small_negatives() {
        let mut w = Writer::new();
        w.write_sint32(1, -1);
        assert_eq!(w.as_slice(), &[0x08, 0x01]);
    }

    #[test]
    fn test_fixed_width_little_endian() {
        let mut w = Writer::new();
        w.write_fixed32(1, 1);
        assert_eq!(w.as_slice(), &[0x0d, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_with_buffer_appends() {
        let mut w = Writer::with_buffer(vec![0xaa]);
        w.write_bool(1, true);
        assert_eq!(w.into_inner(), vec![0xaa, 0x08, 0x01]);
    }
}
