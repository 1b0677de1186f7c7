//! Error types for the wire codec

use crate::wire::WireType;
use thiserror::Error;

/// Reasons a byte buffer failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Buffer truncated: needed {needed} more bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("Varint longer than 10 bytes at offset {offset}")]
    VarintOverflow { offset: usize },

    #[error("Length {length} at offset {offset} runs past end of buffer")]
    LengthOutOfBounds { offset: usize, length: u64 },

    #[error("Field number 0 is reserved (offset {offset})")]
    ZeroFieldNumber { offset: usize },

    #[error("Unsupported wire type {0}")]
    UnsupportedWireType(u8),

    #[error("Field {field}: expected wire type {expected:?}, found {actual:?}")]
    UnexpectedWireType {
        field: u32,
        expected: WireType,
        actual: WireType,
    },

    #[error("Field {field}: string is not valid UTF-8")]
    InvalidUtf8 { field: u32 },

    #[error("Field {field}: value {value} out of range")]
    ValueOutOfRange { field: u32, value: u64 },

    #[error("Nested messages deeper than {0} levels")]
    RecursionLimit(u32),
}
