//! StorageService wire messages.

use hb_01_wire_codec::{DecodeError, Field, Message, Reader, Writer};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetItemRequest {
    pub key: String,
}

impl Message for GetItemRequest {
    fn encode_raw(&self, w: &mut Writer) {
        if !self.key.is_empty() {
            w.write_string(1, &self.key);
        }
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.key = r.read_string(field)?.to_owned(),
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

/// `value` is empty when the key is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetItemResponse {
    pub value: String,
}

impl Message for GetItemResponse {
    fn encode_raw(&self, w: &mut Writer) {
        if !self.value.is_empty() {
            w.write_string(1, &self.value);
        }
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.value = r.read_string(field)?.to_owned(),
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetItemRequest {
    pub key: String,
    pub value: String,
}

impl Message for SetItemRequest {
    fn encode_raw(&self, w: &mut Writer) {
        if !self.key.is_empty() {
            w.write_string(1, &self.key);
        }
        if !self.value.is_empty() {
            w.write_string(2, &self.value);
        }
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.key = r.read_string(field)?.to_owned(),
            2 => self.value = r.read_string(field)?.to_owned(),
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveItemRequest {
    pub key: String,
}

impl Message for RemoveItemRequest {
    fn encode_raw(&self, w: &mut Writer) {
        if !self.key.is_empty() {
            w.write_string(1, &self.key);
        }
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.key = r.read_string(field)?.to_owned(),
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

/// Acknowledgement for writes. Always carries `dummy = true` so the
/// response is never an empty payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    pub dummy: bool,
}

impl Ack {
    pub fn new() -> Self {
        Self { dummy: true }
    }
}

impl Message for Ack {
    fn encode_raw(&self, w: &mut Writer) {
        if self.dummy {
            w.write_bool(1, true);
        }
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.dummy = r.read_bool(field)?,
            _ => r.skip(field)?,
        }
        Ok(())
    }
}
