//! Persistent key-value storage kept by the host page.

pub mod engine;
pub mod host;
pub mod messages;

pub use engine::StorageClient;
pub use host::{storage_service, InMemoryKeyValueStore, KeyValueStore};

pub const STORAGE_SERVICE: &str = "StorageService";
pub const GET_ITEM: &str = "GetItem";
pub const SET_ITEM: &str = "SetItem";
pub const REMOVE_ITEM: &str = "RemoveItem";
pub const CLEAR_ITEMS: &str = "ClearItems";
