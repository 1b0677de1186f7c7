//! In-app purchases.
//!
//! Catalog listing and pending-order bookkeeping are plain unary calls;
//! the purchase itself is a long-running operation that ends after a
//! single success or error event.

pub mod engine;
pub mod host;
pub mod messages;

pub use engine::{
    CuratedProduct, IapServiceClient, IapUseCase, PurchaseError, PurchaseResult, PurchaseStatus,
};
pub use host::{iap_service, InMemoryStore, PurchaseCallbacks, PurchaseProvider};
pub use messages::{
    IapProductListItem, PendingOrder, PurchaseErrorEvent, PurchaseEvent, PurchaseEventKind,
    PurchaseSuccessEvent,
};

pub const IAP_SERVICE: &str = "IapService";
pub const GET_PRODUCT_ITEM_LIST: &str = "GetProductItemList";
pub const CREATE_ONE_TIME_PURCHASE_ORDER: &str = "CreateOneTimePurchaseOrder";
pub const POLL_PURCHASE_EVENTS: &str = "PollPurchaseEvents";
pub const GET_PENDING_ORDERS: &str = "GetPendingOrders";
pub const COMPLETE_PRODUCT_GRANT: &str = "CompleteProductGrant";
