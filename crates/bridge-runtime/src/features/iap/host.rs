//! Host side of the purchase feature.

use super::messages::{
    CompleteProductGrantRequest, CompleteProductGrantResponse, CreateOneTimePurchaseOrderRequest,
    GetPendingOrdersResponse, GetProductItemListResponse, IapProductListItem, PendingOrder,
    PurchaseErrorEvent, PurchaseEvent, PurchaseSuccessEvent,
};
use super::{
    COMPLETE_PRODUCT_GRANT, CREATE_ONE_TIME_PURCHASE_ORDER, GET_PENDING_ORDERS,
    GET_PRODUCT_ITEM_LIST, IAP_SERVICE, POLL_PURCHASE_EVENTS,
};
use async_trait::async_trait;
use hb_03_rpc_multiplexer::{RpcError, ServiceDescriptor};
use hb_04_operation_registry::{
    EventSink, LongRunningMethods, OperationRegistry, OperationServiceExt, StartError,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Callbacks handed to the store SDK for one order.
///
/// A one-time purchase ends after its first outcome, success or error.
#[derive(Clone)]
pub struct PurchaseCallbacks {
    sink: EventSink<PurchaseEvent>,
}

impl PurchaseCallbacks {
    pub fn new(sink: EventSink<PurchaseEvent>) -> Self {
        Self { sink }
    }

    pub fn on_success(&self, event: PurchaseSuccessEvent) {
        info!(operation_id = %self.sink.id(), order_id = %event.order_id, "Purchase succeeded");
        self.sink.emit_terminal(PurchaseEvent::success(event));
    }

    pub fn on_error(&self, code: Option<&str>, message: Option<&str>) {
        let event = PurchaseErrorEvent::from_parts(code, message);
        info!(operation_id = %self.sink.id(), code = %event.error_code, "Purchase failed");
        self.sink.emit_terminal(PurchaseEvent::error(event));
    }

    /// Any other SDK event also ends the flow, without a payload.
    pub fn on_other(&self) {
        self.sink.finish();
    }
}

/// The host's in-app purchase SDK.
#[async_trait]
pub trait PurchaseProvider: Send + Sync {
    /// Products on sale. `None` when the store returned nothing.
    async fn product_items(&self) -> Option<Vec<IapProductListItem>>;

    async fn create_one_time_purchase_order(
        &self,
        sku: &str,
        callbacks: PurchaseCallbacks,
    ) -> Result<(), StartError>;

    async fn pending_orders(&self) -> Vec<PendingOrder>;

    /// Mark an order as granted. False if the order is unknown.
    async fn complete_product_grant(&self, order_id: &str) -> bool;
}

/// Build the IapService descriptor over `provider`.
pub fn iap_service(
    registry: Arc<OperationRegistry<PurchaseEvent>>,
    provider: Arc<dyn PurchaseProvider>,
) -> ServiceDescriptor {
    let list = provider.clone();
    let purchase = provider.clone();
    let pending = provider.clone();
    let grant = provider;

    ServiceDescriptor::new(IAP_SERVICE)
        .unary(GET_PRODUCT_ITEM_LIST, move |_: ()| {
            let provider = list.clone();
            async move {
                let products = provider.product_items().await.unwrap_or_default();
                Ok::<_, RpcError>(GetProductItemListResponse { products })
            }
        })
        .long_running(
            LongRunningMethods::new(CREATE_ONE_TIME_PURCHASE_ORDER, POLL_PURCHASE_EVENTS),
            registry,
            move |request: CreateOneTimePurchaseOrderRequest, sink: EventSink<PurchaseEvent>| {
                let provider = purchase.clone();
                async move {
                    if request.sku.trim().is_empty() {
                        return Err(StartError::Rejected("sku is required".into()));
                    }
                    debug!(operation_id = %sink.id(), sku = %request.sku, "Creating purchase order");
                    provider
                        .create_one_time_purchase_order(&request.sku, PurchaseCallbacks::new(sink))
                        .await
                }
            },
        )
        .unary(GET_PENDING_ORDERS, move |_: ()| {
            let provider = pending.clone();
            async move {
                Ok::<_, RpcError>(GetPendingOrdersResponse {
                    orders: provider.pending_orders().await,
                })
            }
        })
        .unary(
            COMPLETE_PRODUCT_GRANT,
            move |request: CompleteProductGrantRequest| {
                let provider = grant.clone();
                async move {
                    let success = provider.complete_product_grant(&request.order_id).await;
                    Ok::<_, RpcError>(CompleteProductGrantResponse { success })
                }
            },
        )
}

/// In-process store: a fixed catalog, instant payments, and a pending
/// order list until the grant is completed.
pub struct InMemoryStore {
    catalog: Vec<IapProductListItem>,
    declined: HashSet<String>,
    pending: Mutex<Vec<PendingOrder>>,
    next_order: AtomicU64,
    delay: Duration,
}

impl InMemoryStore {
    pub fn new(catalog: Vec<IapProductListItem>, delay: Duration) -> Self {
        Self {
            catalog,
            declined: HashSet::new(),
            pending: Mutex::new(Vec::new()),
            next_order: AtomicU64::new(1),
            delay,
        }
    }

    /// Purchases of `sku` fail as if the player cancelled the payment sheet.
    pub fn decline(mut self, sku: impl Into<String>) -> Self {
        self.declined.insert(sku.into());
        self
    }
}

#[async_trait]
impl PurchaseProvider for InMemoryStore {
    async fn product_items(&self) -> Option<Vec<IapProductListItem>> {
        Some(self.catalog.clone())
    }

    async fn create_one_time_purchase_order(
        &self,
        sku: &str,
        callbacks: PurchaseCallbacks,
    ) -> Result<(), StartError> {
        let product = self.catalog.iter().find(|p| p.sku == sku).cloned();
        let declined = self.declined.contains(sku);
        let order_id = format!("order-{}", self.next_order.fetch_add(1, Ordering::Relaxed));
        let delay = self.delay;

        if let (Some(_), false) = (&product, declined) {
            self.pending.lock().push(PendingOrder {
                order_id: order_id.clone(),
                sku: sku.to_string(),
            });
        }

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match (product, declined) {
                (None, _) => callbacks.on_error(Some("PRODUCT_NOT_FOUND"), Some("Unknown product")),
                (Some(_), true) => callbacks.on_error(Some("USER_CANCELED"), None),
                (Some(product), false) => callbacks.on_success(PurchaseSuccessEvent {
                    order_id,
                    display_name: product.display_name,
                    amount: product.display_amount.replace(',', "").parse().unwrap_or(0),
                    display_amount: product.display_amount,
                    currency: "KRW".to_string(),
                    fraction: 0,
                    mini_app_icon_url: product.icon_url,
                }),
            }
        });
        Ok(())
    }

    async fn pending_orders(&self) -> Vec<PendingOrder> {
        self.pending.lock().clone()
    }

    async fn complete_product_grant(&self, order_id: &str) -> bool {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.retain(|o| o.order_id != order_id);
        pending.len() != before
    }
}
