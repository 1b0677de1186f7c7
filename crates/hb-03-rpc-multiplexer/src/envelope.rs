//! The envelope framing every call and response.

use crate::error::RpcError;
use bytes::Bytes;
use hb_01_wire_codec::{DecodeError, Field, Message, Reader, Writer};

/// Whether an envelope asks or answers.
///
/// Kinds this side does not understand are kept so the envelope can still
/// be answered under its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeKind {
    #[default]
    Request,
    Response,
    Unsupported(u32),
}

impl EnvelopeKind {
    fn as_raw(self) -> u32 {
        match self {
            EnvelopeKind::Request => 0,
            EnvelopeKind::Response => 1,
            EnvelopeKind::Unsupported(raw) => raw,
        }
    }

    fn from_raw(raw: u32) -> Self {
        match raw {
            0 => EnvelopeKind::Request,
            1 => EnvelopeKind::Response,
            other => EnvelopeKind::Unsupported(other),
        }
    }
}

/// Error details inside a response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RpcErrorBody {
    pub code: i32,
    pub message: String,
}

impl Message for RpcErrorBody {
    fn encode_raw(&self, w: &mut Writer) {
        if self.code != 0 {
            w.write_sint32(1, self.code);
        }
        if !self.message.is_empty() {
            w.write_string(2, &self.message);
        }
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.code = r.read_sint32(field)?,
            2 => self.message = r.read_string(field)?.to_owned(),
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

impl From<RpcError> for RpcErrorBody {
    fn from(e: RpcError) -> Self {
        Self {
            code: e.code,
            message: e.message,
        }
    }
}

impl From<RpcErrorBody> for RpcError {
    fn from(body: RpcErrorBody) -> Self {
        RpcError::new(body.code, body.message)
    }
}

/// `{method selector, correlation token, opaque payload}` plus the
/// direction and, for failed responses, the error.
///
/// ```text
/// field 1  string  correlation_id
/// field 2  string  method            "Service.Method"
/// field 3  bytes   payload           encoded request or response
/// field 4  enum    kind              0 = request, 1 = response
/// field 5  message error             set only on failed responses
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Envelope {
    pub correlation_id: String,
    pub method: String,
    pub payload: Bytes,
    pub kind: EnvelopeKind,
    pub error: Option<RpcErrorBody>,
}

impl Envelope {
    pub fn request(correlation_id: impl Into<String>, method: impl Into<String>, payload: Bytes) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            method: method.into(),
            payload,
            kind: EnvelopeKind::Request,
            error: None,
        }
    }

    /// Build the single response to `request`.
    pub fn response_to(request_id: &str, method: &str, result: Result<Vec<u8>, RpcError>) -> Self {
        let (payload, error) = match result {
            Ok(bytes) => (Bytes::from(bytes), None),
            Err(e) => (Bytes::new(), Some(e.into())),
        };
        Self {
            correlation_id: request_id.to_string(),
            method: method.to_string(),
            payload,
            kind: EnvelopeKind::Response,
            error,
        }
    }

    /// Split a response into the caller-facing result.
    pub fn into_result(self) -> Result<Bytes, RpcError> {
        match self.error {
            Some(body) => Err(body.into()),
            None => Ok(self.payload),
        }
    }
}

impl Message for Envelope {
    fn encode_raw(&self, w: &mut Writer) {
        if !self.correlation_id.is_empty() {
            w.write_string(1, &self.correlation_id);
        }
        if !self.method.is_empty() {
            w.write_string(2, &self.method);
        }
        if !self.payload.is_empty() {
            w.write_bytes(3, &self.payload);
        }
        if self.kind != EnvelopeKind::Request {
            w.write_uint32(4, self.kind.as_raw());
        }
        if let Some(error) = &self.error {
            w.write_message(5, error);
        }
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.correlation_id = r.read_string(field)?.to_owned(),
            2 => self.method = r.read_string(field)?.to_owned(),
            3 => self.payload = Bytes::copy_from_slice(r.read_bytes(field)?),
            4 => self.kind = EnvelopeKind::from_raw(r.read_uint32(field)?),
            5 => self.error = Some(r.read_message(field)?),
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::codes;

    #[test]
    fn test_request_roundtrip() {
        let env = Envelope::request("tok-1", "AdService.LoadAd", Bytes::from_static(b"\x0a\x01x"));
        let decoded = Envelope::decode(&env.encode_to_vec()).unwrap();
        assert_eq!(decoded, env);
        assert_eq!(decoded.kind, EnvelopeKind::Request);
        assert_eq!(decoded.error, None);
    }

    #[test]
    fn test_error_response_roundtrip() {
        let env = Envelope::response_to(
            "tok-2",
            "AdService.Nope",
            Err(RpcError::method_not_found("AdService.Nope")),
        );
        let decoded = Envelope::decode(&env.encode_to_vec()).unwrap();
        assert_eq!(decoded.kind, EnvelopeKind::Response);
        let err = decoded.into_result().unwrap_err();
        assert_eq!(err.code, codes::METHOD_NOT_FOUND);
    }

    #[test]
    fn test_success_with_empty_payload() {
        let env = Envelope::response_to("tok-3", "StorageService.ClearItems", Ok(Vec::new()));
        let decoded = Envelope::decode(&env.encode_to_vec()).unwrap();
        assert!(decoded.into_result().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_kind_kept_with_token() {
        let mut w = Writer::new();
        w.write_string(1, "tok-4");
        w.write_uint32(4, 7);
        let decoded = Envelope::decode(&w.into_inner()).unwrap();
        assert_eq!(decoded.kind, EnvelopeKind::Unsupported(7));
        assert_eq!(decoded.correlation_id, "tok-4");
    }

    #[test]
    fn test_future_fields_ignored() {
        let mut w = Writer::new();
        w.write_string(1, "tok");
        w.write_uint64(15, 99);
        w.write_string(2, "Svc.M");
        let decoded = Envelope::decode(&w.into_inner()).unwrap();
        assert_eq!(decoded.correlation_id, "tok");
        assert_eq!(decoded.method, "Svc.M");
    }
}
