//! Engine side of key-value storage.

use super::messages::{Ack, GetItemRequest, GetItemResponse, RemoveItemRequest, SetItemRequest};
use super::{CLEAR_ITEMS, GET_ITEM, REMOVE_ITEM, SET_ITEM, STORAGE_SERVICE};
use hb_03_rpc_multiplexer::{method_selector, RpcError, RpcMultiplexer};
use std::sync::Arc;

/// Typed client for the StorageService.
#[derive(Clone)]
pub struct StorageClient {
    mux: Arc<RpcMultiplexer>,
}

impl StorageClient {
    pub fn new(mux: Arc<RpcMultiplexer>) -> Self {
        Self { mux }
    }

    /// `None` when the key is missing. The host cannot tell a missing key
    /// from an empty value, so an empty value reads back as `None` too.
    pub async fn get_item(&self, key: &str) -> Result<Option<String>, RpcError> {
        let request = GetItemRequest {
            key: key.to_string(),
        };
        let response: GetItemResponse = self
            .mux
            .call(&method_selector(STORAGE_SERVICE, GET_ITEM), &request)
            .await?;
        Ok(Some(response.value).filter(|v| !v.is_empty()))
    }

    pub async fn set_item(&self, key: &str, value: &str) -> Result<(), RpcError> {
        let request = SetItemRequest {
            key: key.to_string(),
            value: value.to_string(),
        };
        let _: Ack = self
            .mux
            .call(&method_selector(STORAGE_SERVICE, SET_ITEM), &request)
            .await?;
        Ok(())
    }

    pub async fn remove_item(&self, key: &str) -> Result<(), RpcError> {
        let request = RemoveItemRequest {
            key: key.to_string(),
        };
        let _: Ack = self
            .mux
            .call(&method_selector(STORAGE_SERVICE, REMOVE_ITEM), &request)
            .await?;
        Ok(())
    }

    pub async fn clear_items(&self) -> Result<(), RpcError> {
        let _: Ack = self
            .mux
            .call(&method_selector(STORAGE_SERVICE, CLEAR_ITEMS), &())
            .await?;
        Ok(())
    }
}
