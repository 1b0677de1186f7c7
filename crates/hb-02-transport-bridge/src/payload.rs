//! Base64 framing for the text hop.

use crate::error::TransportError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;

pub(crate) fn encode(payload: &[u8]) -> String {
    STANDARD.encode(payload)
}

pub(crate) fn decode(text: &str) -> Result<Bytes, TransportError> {
    STANDARD
        .decode(text.trim())
        .map(Bytes::from)
        .map_err(|e| TransportError::MalformedPayload(e.to_string()))
}
