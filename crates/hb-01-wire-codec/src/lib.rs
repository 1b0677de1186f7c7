//! # HB-01 Wire Codec
//!
//! Compact tagged binary format used for every envelope and payload that
//! crosses the bridge.
//!
//! ## Format
//!
//! A message is a flat sequence of fields. Each field starts with a varint
//! tag `(field_number << 3) | wire_type`, followed by the value:
//!
//! ```text
//! ┌────────────┬───────────┬────────────────────────────────────────────┐
//! │ wire type  │ id        │ value layout                               │
//! ├────────────┼───────────┼────────────────────────────────────────────┤
//! │ Varint     │ 0         │ 7-bit groups, LSB first, MSB = continue    │
//! │ Fixed64    │ 1         │ 8 bytes little-endian                      │
//! │ Delimited  │ 2         │ varint length, then that many bytes        │
//! │ Fixed32    │ 5         │ 4 bytes little-endian                      │
//! └────────────┴───────────┴────────────────────────────────────────────┘
//! ```
//!
//! Signed `sint*` fields are zigzag mapped before varint encoding. Strings,
//! byte blobs and nested messages are length-delimited. Repeated fields are
//! simply the same tag written once per element, in order.
//!
//! ## Compatibility
//!
//! Readers skip any field number they do not know, using only its wire
//! type. Adding a field on one side never breaks the other.
//!
//! ## Usage
//!
//! ```ignore
//! use hb_01_wire_codec::{Field, Message, Reader, Writer, DecodeError};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Ping { nonce: u64 }
//!
//! impl Message for Ping {
//!     fn encode_raw(&self, w: &mut Writer) {
//!         if self.nonce != 0 {
//!             w.write_uint64(1, self.nonce);
//!         }
//!     }
//!
//!     fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
//!         match field.number {
//!             1 => self.nonce = r.read_uint64(field)?,
//!             _ => r.skip(field)?,
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let bytes = Ping { nonce: 7 }.encode_to_vec();
//! assert_eq!(Ping::decode(&bytes)?, Ping { nonce: 7 });
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![deny(unsafe_code)]

pub mod error;
pub mod message;
pub mod pool;
pub mod reader;
pub mod wire;
pub mod writer;

pub use error::DecodeError;
pub use message::Message;
pub use pool::BufferPool;
pub use reader::{Field, Reader};
pub use wire::WireType;
pub use writer::Writer;

/// Maximum nesting depth accepted by the reader.
pub const MAX_RECURSION_DEPTH: u32 = 64;
