//! Message reader.

use crate::error::DecodeError;
use crate::message::Message;
use crate::wire::{decode_varint, zigzag_decode32, zigzag_decode64, WireType, MAX_FIELD_NUMBER};
use crate::MAX_RECURSION_DEPTH;

/// A decoded field header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub number: u32,
    pub wire_type: WireType,
}

impl Field {
    fn expect(&self, expected: WireType) -> Result<(), DecodeError> {
        if self.wire_type == expected {
            Ok(())
        } else {
            Err(DecodeError::UnexpectedWireType {
                field: self.number,
                expected,
                actual: self.wire_type,
            })
        }
    }
}

/// Cursor over an encoded message.
///
/// Typed reads take the [`Field`] they belong to and fail if its wire type
/// does not match, so a peer that changed a field's type is caught instead
/// of silently misread.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    depth: u32,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            depth: 0,
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Read the next field header, or `None` at end of message.
    pub fn next_field(&mut self) -> Result<Option<Field>, DecodeError> {
        if self.is_at_end() {
            return Ok(None);
        }
        let offset = self.pos;
        let tag = self.read_varint()?;
        let raw_number = tag >> 3;
        if raw_number == 0 {
            return Err(DecodeError::ZeroFieldNumber { offset });
        }
        if raw_number > u64::from(MAX_FIELD_NUMBER) {
            return Err(DecodeError::ValueOutOfRange {
                field: 0,
                value: raw_number,
            });
        }
        let number = raw_number as u32;
        let wire_type = WireType::from_raw((tag & 0x07) as u8)?;
        Ok(Some(Field { number, wire_type }))
    }

    fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let offset = self.pos;
        let (value, len) = decode_varint(&self.buf[self.pos..]).map_err(|e| match e {
            DecodeError::Truncated { needed, .. } => DecodeError::Truncated {
                offset: self.buf.len(),
                needed,
            },
            DecodeError::VarintOverflow { .. } => DecodeError::VarintOverflow { offset },
            other => other,
        })?;
        self.pos += len;
        Ok(value)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: len - self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn read_length_delimited(&mut self) -> Result<&'a [u8], DecodeError> {
        let offset = self.pos;
        let length = self.read_varint()?;
        if length > self.remaining() as u64 {
            return Err(DecodeError::LengthOutOfBounds { offset, length });
        }
        self.take(length as usize)
    }

    pub fn read_uint64(&mut self, field: Field) -> Result<u64, DecodeError> {
        field.expect(WireType::Varint)?;
        self.read_varint()
    }

    pub fn read_uint32(&mut self, field: Field) -> Result<u32, DecodeError> {
        let value = self.read_uint64(field)?;
        u32::try_from(value).map_err(|_| DecodeError::ValueOutOfRange {
            field: field.number,
            value,
        })
    }

    pub fn read_int64(&mut self, field: Field) -> Result<i64, DecodeError> {
        Ok(self.read_uint64(field)? as i64)
    }

    /// Truncates to the low 32 bits, matching how sign-extended values are written.
    pub fn read_int32(&mut self, field: Field) -> Result<i32, DecodeError> {
        Ok(self.read_uint64(field)? as i32)
    }

    pub fn read_sint32(&mut self, field: Field) -> Result<i32, DecodeError> {
        Ok(zigzag_decode32(self.read_uint64(field)? as u32))
    }

    pub fn read_sint64(&mut self, field: Field) -> Result<i64, DecodeError> {
        Ok(zigzag_decode64(self.read_uint64(field)?))
    }

    pub fn read_bool(&mut self, field: Field) -> Result<bool, DecodeError> {
        Ok(self.read_uint64(field)? != 0)
    }

    pub fn read_fixed32(&mut self, field: Field) -> Result<u32, DecodeError> {
        field.expect(WireType::Fixed32)?;
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn read_fixed64(&mut self, field: Field) -> Result<u64, DecodeError> {
        field.expect(WireType::Fixed64)?;
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    pub fn read_float(&mut self, field: Field) -> Result<f32, DecodeError> {
        field.expect(WireType::Fixed32)?;
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    pub fn read_double(&mut self, field: Field) -> Result<f64, DecodeError> {
        field.expect(WireType::Fixed64)?;
        Ok(f64::from_le_bytes(self.take_array()?))
    }

    pub fn read_bytes(&mut self, field: Field) -> Result<&'a [u8], DecodeError> {
        field.expect(WireType::LengthDelimited)?;
        self.read_length_delimited()
    }

    pub fn read_string(&mut self, field: Field) -> Result<&'a str, DecodeError> {
        let bytes = self.read_bytes(field)?;
        std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 {
            field: field.number,
        })
    }

    /// Decode a nested message field.
    pub fn read_message<M: Message>(&mut self, field: Field) -> Result<M, DecodeError> {
        let mut message = M::default();
        self.merge_message(field, &mut message)?;
        Ok(message)
    }

    /// Merge a nested message field into an existing value.
    pub fn merge_message<M: Message>(
        &mut self,
        field: Field,
        message: &mut M,
    ) -> Result<(), DecodeError> {
        let body = self.read_bytes(field)?;
        if self.depth + 1 > MAX_RECURSION_DEPTH {
            return Err(DecodeError::RecursionLimit(MAX_RECURSION_DEPTH));
        }
        let mut nested = Reader {
            buf: body,
            pos: 0,
            depth: self.depth + 1,
        };
        message.merge(&mut nested)
    }

    /// Skip the value of a field this side does not know.
    pub fn skip(&mut self, field: Field) -> Result<(), DecodeError> {
        match field.wire_type {
            WireType::Varint => self.read_varint().map(|_| ()),
            WireType::Fixed64 => self.take(8).map(|_| ()),
            WireType::Fixed32 => self.take(4).map(|_| ()),
            WireType::LengthDelimited => self.read_length_delimited().map(|_| ()),
        }
    }
}
