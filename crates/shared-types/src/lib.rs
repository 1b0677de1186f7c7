//! # Shared Types Crate
//!
//! Identifiers and error classification shared by the engine side and the
//! host side of the bridge.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the correlation token format, the operation
//!   id format and every numeric error code are defined here once.
//! - **Opaque on the wire**: both identifiers travel as strings; only the
//!   side that minted an id interprets it.

pub mod errors;
pub mod ids;

pub use errors::{codes, ErrorKind, InvalidIdError};
pub use ids::{CorrelationId, OperationId};
