//! # Error Types
//!
//! Numeric error codes carried in response envelopes, and the coarse
//! classification both sides use to decide how to react to them.

use thiserror::Error;

/// Error codes carried in a response envelope.
///
/// The protocol range mirrors JSON-RPC 2.0 so the numbers read familiar in
/// logs; the server range is specific to the bridge.
pub mod codes {
    // Protocol errors (-32700 to -32600)
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    // Bridge errors (-32000 to -32099)
    pub const HANDLER_ERROR: i32 = -32000;
    pub const RESOURCE_CONTENTION: i32 = -32005;
    pub const TIMEOUT: i32 = -32006;
    pub const TRANSPORT_UNAVAILABLE: i32 = -32010;
    pub const CANCELLED: i32 = -32011;
}

/// How a failure should be treated by whoever observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No host channel present; fail fast, nothing was sent.
    TransportUnavailable,
    /// Malformed envelope, unknown method, or undecodable payload.
    Protocol,
    /// A handler or the feature behind it failed.
    Handler,
    /// An exclusive resource is already held.
    ResourceContention,
    /// No response arrived in time.
    Timeout,
    /// The caller gave up.
    Cancelled,
}

impl ErrorKind {
    /// Classify a wire error code.
    pub fn from_code(code: i32) -> Self {
        match code {
            codes::PARSE_ERROR
            | codes::INVALID_REQUEST
            | codes::METHOD_NOT_FOUND
            | codes::INVALID_PARAMS => Self::Protocol,
            codes::RESOURCE_CONTENTION => Self::ResourceContention,
            codes::TIMEOUT => Self::Timeout,
            codes::TRANSPORT_UNAVAILABLE => Self::TransportUnavailable,
            codes::CANCELLED => Self::Cancelled,
            _ => Self::Handler,
        }
    }
}

/// An identifier received on the wire could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidIdError {
    #[error("Invalid correlation id: {0:?}")]
    Correlation(String),
}
