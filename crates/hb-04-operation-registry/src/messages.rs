//! Wire messages of the Start/Poll protocol.

use hb_01_wire_codec::{DecodeError, Field, Message, Reader, Writer};

/// Answer to a Start call. Empty id means the flow never began.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StartOperationResponse {
    pub operation_id: String,
}

impl Message for StartOperationResponse {
    fn encode_raw(&self, w: &mut Writer) {
        if !self.operation_id.is_empty() {
            w.write_string(1, &self.operation_id);
        }
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.operation_id = r.read_string(field)?.to_owned(),
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollEventsRequest {
    pub operation_id: String,
}

impl Message for PollEventsRequest {
    fn encode_raw(&self, w: &mut Writer) {
        if !self.operation_id.is_empty() {
            w.write_string(1, &self.operation_id);
        }
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.operation_id = r.read_string(field)?.to_owned(),
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

/// Events drained by one poll, in production order.
#[derive(Debug, Clone, PartialEq)]
pub struct PollEventsResponse<E> {
    pub events: Vec<E>,
    pub is_finished: bool,
}

impl<E> Default for PollEventsResponse<E> {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            is_finished: false,
        }
    }
}

impl<E: Message> Message for PollEventsResponse<E> {
    fn encode_raw(&self, w: &mut Writer) {
        w.write_repeated_message(1, &self.events);
        if self.is_finished {
            w.write_bool(2, true);
        }
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.events.push(r.read_message(field)?),
            2 => self.is_finished = r.read_bool(field)?,
            _ => r.skip(field)?,
        }
        Ok(())
    }
}
