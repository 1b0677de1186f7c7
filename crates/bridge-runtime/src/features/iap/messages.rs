//! IapService wire messages.

use hb_01_wire_codec::{DecodeError, Field, Message, Reader, Writer};

fn write_str(w: &mut Writer, field: u32, value: &str) {
    if !value.is_empty() {
        w.write_string(field, value);
    }
}

fn read_str(r: &mut Reader<'_>, field: Field) -> Result<String, DecodeError> {
    Ok(r.read_string(field)?.to_owned())
}

/// A product as listed by the host store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IapProductListItem {
    pub sku: String,
    pub display_name: String,
    pub display_amount: String,
    pub icon_url: String,
    pub description: String,
}

impl Message for IapProductListItem {
    fn encode_raw(&self, w: &mut Writer) {
        write_str(w, 1, &self.sku);
        write_str(w, 2, &self.display_name);
        write_str(w, 3, &self.display_amount);
        write_str(w, 4, &self.icon_url);
        write_str(w, 5, &self.description);
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.sku = read_str(r, field)?,
            2 => self.display_name = read_str(r, field)?,
            3 => self.display_amount = read_str(r, field)?,
            4 => self.icon_url = read_str(r, field)?,
            5 => self.description = read_str(r, field)?,
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetProductItemListResponse {
    pub products: Vec<IapProductListItem>,
}

impl Message for GetProductItemListResponse {
    fn encode_raw(&self, w: &mut Writer) {
        w.write_repeated_message(1, &self.products);
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.products.push(r.read_message(field)?),
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOneTimePurchaseOrderRequest {
    pub sku: String,
}

impl Message for CreateOneTimePurchaseOrderRequest {
    fn encode_raw(&self, w: &mut Writer) {
        write_str(w, 1, &self.sku);
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.sku = read_str(r, field)?,
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseSuccessEvent {
    pub order_id: String,
    pub display_name: String,
    pub display_amount: String,
    /// Price in minor units
    pub amount: i64,
    pub currency: String,
    /// Number of minor-unit digits
    pub fraction: i32,
    pub mini_app_icon_url: String,
}

impl Message for PurchaseSuccessEvent {
    fn encode_raw(&self, w: &mut Writer) {
        write_str(w, 1, &self.order_id);
        write_str(w, 2, &self.display_name);
        write_str(w, 3, &self.display_amount);
        if self.amount != 0 {
            w.write_int64(4, self.amount);
        }
        write_str(w, 5, &self.currency);
        if self.fraction != 0 {
            w.write_int32(6, self.fraction);
        }
        write_str(w, 7, &self.mini_app_icon_url);
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.order_id = read_str(r, field)?,
            2 => self.display_name = read_str(r, field)?,
            3 => self.display_amount = read_str(r, field)?,
            4 => self.amount = r.read_int64(field)?,
            5 => self.currency = read_str(r, field)?,
            6 => self.fraction = r.read_int32(field)?,
            7 => self.mini_app_icon_url = read_str(r, field)?,
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseErrorEvent {
    pub error_code: String,
    pub error_message: String,
}

impl PurchaseErrorEvent {
    pub const UNKNOWN_CODE: &'static str = "UNKNOWN_ERROR";
    pub const UNKNOWN_MESSAGE: &'static str = "An unknown error occurred.";

    /// Build from SDK error fields, filling the gaps with the unknown-error text.
    pub fn from_parts(code: Option<&str>, message: Option<&str>) -> Self {
        Self {
            error_code: code.unwrap_or(Self::UNKNOWN_CODE).to_string(),
            error_message: message.unwrap_or(Self::UNKNOWN_MESSAGE).to_string(),
        }
    }

    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: code.into(),
            error_message: message.into(),
        }
    }
}

impl Message for PurchaseErrorEvent {
    fn encode_raw(&self, w: &mut Writer) {
        write_str(w, 1, &self.error_code);
        write_str(w, 2, &self.error_message);
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.error_code = read_str(r, field)?,
            2 => self.error_message = read_str(r, field)?,
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseEventKind {
    Success(PurchaseSuccessEvent),
    Error(PurchaseErrorEvent),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseEvent {
    pub kind: Option<PurchaseEventKind>,
}

impl PurchaseEvent {
    pub fn success(event: PurchaseSuccessEvent) -> Self {
        Self {
            kind: Some(PurchaseEventKind::Success(event)),
        }
    }

    pub fn error(event: PurchaseErrorEvent) -> Self {
        Self {
            kind: Some(PurchaseEventKind::Error(event)),
        }
    }
}

impl Message for PurchaseEvent {
    fn encode_raw(&self, w: &mut Writer) {
        match &self.kind {
            Some(PurchaseEventKind::Success(event)) => w.write_message(1, event),
            Some(PurchaseEventKind::Error(event)) => w.write_message(2, event),
            None => {}
        }
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.kind = Some(PurchaseEventKind::Success(r.read_message(field)?)),
            2 => self.kind = Some(PurchaseEventKind::Error(r.read_message(field)?)),
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

/// An order paid for but not yet granted in game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingOrder {
    pub order_id: String,
    pub sku: String,
}

impl Message for PendingOrder {
    fn encode_raw(&self, w: &mut Writer) {
        write_str(w, 1, &self.order_id);
        write_str(w, 2, &self.sku);
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.order_id = read_str(r, field)?,
            2 => self.sku = read_str(r, field)?,
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetPendingOrdersResponse {
    pub orders: Vec<PendingOrder>,
}

impl Message for GetPendingOrdersResponse {
    fn encode_raw(&self, w: &mut Writer) {
        w.write_repeated_message(1, &self.orders);
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.orders.push(r.read_message(field)?),
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompleteProductGrantRequest {
    pub order_id: String,
}

impl Message for CompleteProductGrantRequest {
    fn encode_raw(&self, w: &mut Writer) {
        write_str(w, 1, &self.order_id);
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.order_id = read_str(r, field)?,
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompleteProductGrantResponse {
    pub success: bool,
}

impl Message for CompleteProductGrantResponse {
    fn encode_raw(&self, w: &mut Writer) {
        if self.success {
            w.write_bool(1, true);
        }
    }

    fn merge_field(&mut self, field: Field, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.success = r.read_bool(field)?,
            _ => r.skip(field)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_defaults() {
        let event = PurchaseErrorEvent::from_parts(None, None);
        assert_eq!(event.error_code, "UNKNOWN_ERROR");
        assert_eq!(event.error_message, "An unknown error occurred.");

        let event = PurchaseErrorEvent::from_parts(Some("USER_CANCELED"), None);
        assert_eq!(event.error_code, "USER_CANCELED");
    }

    #[test]
    fn test_success_event_survives_wire() {
        let event = PurchaseEvent::success(PurchaseSuccessEvent {
            order_id: "order-1".into(),
            display_name: "Gem pack".into(),
            display_amount: "1,200".into(),
            amount: 1200,
            currency: "KRW".into(),
            fraction: 0,
            mini_app_icon_url: String::new(),
        });
        assert_eq!(PurchaseEvent::decode(&event.encode_to_vec()).unwrap(), event);
    }

    #[test]
    fn test_products_keep_catalog_order() {
        let response = GetProductItemListResponse {
            products: ["b", "a", "c"]
                .iter()
                .map(|sku| IapProductListItem {
                    sku: sku.to_string(),
                    ..Default::default()
                })
                .collect(),
        };
        let decoded = GetProductItemListResponse::decode(&response.encode_to_vec()).unwrap();
        let skus: Vec<_> = decoded.products.iter().map(|p| p.sku.as_str()).collect();
        assert_eq!(skus, vec!["b", "a", "c"]);
    }
}
