//! Host side of key-value storage.

use super::messages::{Ack, GetItemRequest, GetItemResponse, RemoveItemRequest, SetItemRequest};
use super::{CLEAR_ITEMS, GET_ITEM, REMOVE_ITEM, SET_ITEM, STORAGE_SERVICE};
use hb_03_rpc_multiplexer::{RpcError, ServiceDescriptor};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The host page's persistent string store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    items: RwLock<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.items.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.items.write().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.items.write().remove(key);
    }

    fn clear(&self) {
        self.items.write().clear();
    }
}

/// Build the StorageService descriptor over `store`.
pub fn storage_service(store: Arc<dyn KeyValueStore>) -> ServiceDescriptor {
    let get = store.clone();
    let set = store.clone();
    let remove = store.clone();
    let clear = store;

    ServiceDescriptor::new(STORAGE_SERVICE)
        .unary(GET_ITEM, move |request: GetItemRequest| {
            let value = get.get(&request.key).unwrap_or_default();
            async move { Ok::<_, RpcError>(GetItemResponse { value }) }
        })
        .unary(SET_ITEM, move |request: SetItemRequest| {
            debug!(key = %request.key, bytes = request.value.len(), "Storage set");
            set.set(&request.key, &request.value);
            async move { Ok::<_, RpcError>(Ack::new()) }
        })
        .unary(REMOVE_ITEM, move |request: RemoveItemRequest| {
            remove.remove(&request.key);
            async move { Ok::<_, RpcError>(Ack::new()) }
        })
        .unary(CLEAR_ITEMS, move |_: ()| {
            clear.clear();
            async move { Ok::<_, RpcError>(Ack::new()) }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_store() {
        let store = InMemoryKeyValueStore::new();
        assert_eq!(store.get("a"), None);
        store.set("a", "1");
        store.set("b", "2");
        store.set("a", "3");
        assert_eq!(store.get("a").as_deref(), Some("3"));
        store.remove("a");
        assert_eq!(store.len(), 1);
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_descriptor_methods() {
        let service = storage_service(Arc::new(InMemoryKeyValueStore::new()));
        let mut methods: Vec<_> = service.method_names().collect();
        methods.sort_unstable();
        assert_eq!(methods, vec!["ClearItems", "GetItem", "RemoveItem", "SetItem"]);
    }
}
