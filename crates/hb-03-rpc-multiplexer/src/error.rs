//! Structured RPC errors.

use hb_01_wire_codec::DecodeError;
use hb_02_transport_bridge::TransportError;
use shared_types::{codes, ErrorKind};
use thiserror::Error;

/// Error carried back to a caller, locally or inside a response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from_code(self.code)
    }

    /// Envelope could not be decoded
    pub fn parse_error(details: impl Into<String>) -> Self {
        Self::new(
            codes::PARSE_ERROR,
            format!("Parse error: {}", details.into()),
        )
    }

    /// Envelope decoded but is not a usable request
    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::new(
            codes::INVALID_REQUEST,
            format!("Invalid request: {}", details.into()),
        )
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )
    }

    /// Request payload failed to decode as the method's request type
    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::new(
            codes::INVALID_PARAMS,
            format!("Invalid params: {}", details.into()),
        )
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(
            codes::INTERNAL_ERROR,
            format!("Internal error: {}", details.into()),
        )
    }

    /// The handler itself failed
    pub fn handler(details: impl Into<String>) -> Self {
        Self::new(codes::HANDLER_ERROR, details.into())
    }

    pub fn resource_contention(resource: impl Into<String>) -> Self {
        Self::new(
            codes::RESOURCE_CONTENTION,
            format!("Resource busy: {}", resource.into()),
        )
    }

    pub fn timeout(method: impl Into<String>) -> Self {
        Self::new(
            codes::TIMEOUT,
            format!("Request timeout: {}", method.into()),
        )
    }

    pub fn transport_unavailable(details: impl Into<String>) -> Self {
        Self::new(codes::TRANSPORT_UNAVAILABLE, details.into())
    }

    pub fn cancelled(method: impl Into<String>) -> Self {
        Self::new(
            codes::CANCELLED,
            format!("Cancelled: {}", method.into()),
        )
    }
}

impl From<TransportError> for RpcError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Unavailable(_) => Self::transport_unavailable(e.to_string()),
            TransportError::MalformedPayload(details) => Self::parse_error(details),
        }
    }
}

impl From<DecodeError> for RpcError {
    fn from(e: DecodeError) -> Self {
        Self::parse_error(e.to_string())
    }
}

/// Errors raised while registering services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Service already registered: {0}")]
    DuplicateService(String),

    #[error("Method registered twice: {0}")]
    DuplicateMethod(String),

    #[error("Invalid name {0:?}: must be non-empty and contain no '.'")]
    InvalidName(String),
}
