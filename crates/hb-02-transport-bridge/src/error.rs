//! Error types for the transport bridge

use crate::Side;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Nothing is wired on the other end of this side.
    #[error("Transport unavailable: no peer attached to the {0} side")]
    Unavailable(Side),

    /// Inbound text was not valid base64.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}
