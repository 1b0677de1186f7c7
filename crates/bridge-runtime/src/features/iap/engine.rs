//! Engine side of the purchase feature.

use super::messages::{
    CompleteProductGrantRequest, CompleteProductGrantResponse, CreateOneTimePurchaseOrderRequest,
    GetPendingOrdersResponse, GetProductItemListResponse, IapProductListItem, PendingOrder,
    PurchaseErrorEvent, PurchaseEvent, PurchaseEventKind, PurchaseSuccessEvent,
};
use super::{
    COMPLETE_PRODUCT_GRANT, CREATE_ONE_TIME_PURCHASE_ORDER, GET_PENDING_ORDERS,
    GET_PRODUCT_ITEM_LIST, IAP_SERVICE, POLL_PURCHASE_EVENTS,
};
use crate::config::{CuratedIapSpot, MonetizationConfig};
use futures::stream::{BoxStream, StreamExt};
use hb_03_rpc_multiplexer::{method_selector, RpcError, RpcMultiplexer};
use hb_04_operation_registry::{OperationClient, OperationError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Typed client for the IapService.
#[derive(Clone)]
pub struct IapServiceClient {
    mux: Arc<RpcMultiplexer>,
    operations: OperationClient,
}

impl IapServiceClient {
    pub fn new(mux: Arc<RpcMultiplexer>, operations: OperationClient) -> Self {
        Self { mux, operations }
    }

    pub async fn get_product_item_list(
        &self,
        cancel: &CancellationToken,
    ) -> Result<GetProductItemListResponse, RpcError> {
        self.mux
            .call_with_cancel(&method_selector(IAP_SERVICE, GET_PRODUCT_ITEM_LIST), &(), cancel)
            .await
    }

    pub fn purchase_events(
        &self,
        sku: &str,
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<PurchaseEvent, OperationError>> {
        self.operations.events(
            &method_selector(IAP_SERVICE, CREATE_ONE_TIME_PURCHASE_ORDER),
            &method_selector(IAP_SERVICE, POLL_PURCHASE_EVENTS),
            CreateOneTimePurchaseOrderRequest {
                sku: sku.to_string(),
            },
            cancel,
        )
    }

    pub async fn get_pending_orders(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<PendingOrder>, RpcError> {
        let response: GetPendingOrdersResponse = self
            .mux
            .call_with_cancel(&method_selector(IAP_SERVICE, GET_PENDING_ORDERS), &(), cancel)
            .await?;
        Ok(response.orders)
    }

    pub async fn complete_product_grant(
        &self,
        order_id: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, RpcError> {
        let request = CompleteProductGrantRequest {
            order_id: order_id.to_string(),
        };
        let response: CompleteProductGrantResponse = self
            .mux
            .call_with_cancel(&method_selector(IAP_SERVICE, COMPLETE_PRODUCT_GRANT), &request, cancel)
            .await?;
        Ok(response.success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseStatus {
    Success,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseResult {
    pub sku: String,
    pub status: PurchaseStatus,
    pub success: Option<PurchaseSuccessEvent>,
    pub error: Option<PurchaseErrorEvent>,
}

impl PurchaseResult {
    fn succeeded(sku: &str, event: PurchaseSuccessEvent) -> Self {
        Self {
            sku: sku.to_string(),
            status: PurchaseStatus::Success,
            success: Some(event),
            error: None,
        }
    }

    fn failed(sku: &str, error: PurchaseErrorEvent) -> Self {
        Self {
            sku: sku.to_string(),
            status: PurchaseStatus::Failed,
            success: None,
            error: Some(error),
        }
    }

    fn cancelled(sku: &str) -> Self {
        Self {
            sku: sku.to_string(),
            status: PurchaseStatus::Cancelled,
            success: None,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PurchaseStatus::Success
    }
}

/// Requests that can never reach the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurchaseError {
    #[error("sku is required")]
    MissingSku,
    #[error("Unknown curated spot: {0}")]
    UnknownSpot(String),
    #[error("Curated spot {0} does not map to a SKU")]
    UnmappedSpot(String),
}

/// A curated spot joined with the store's listing for its SKU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuratedProduct {
    pub spot: CuratedIapSpot,
    pub product: IapProductListItem,
}

struct CachedCatalog {
    products: Vec<IapProductListItem>,
    fetched_at: Instant,
}

/// Purchases by SKU or curated spot, with a cached remote catalog.
pub struct IapUseCase {
    client: IapServiceClient,
    spots: Vec<CuratedIapSpot>,
    catalog_ttl: Duration,
    catalog: Mutex<Option<CachedCatalog>>,
}

impl IapUseCase {
    pub fn new(client: IapServiceClient, config: &MonetizationConfig) -> Self {
        Self {
            client,
            spots: config.curated_iap_spots.clone(),
            catalog_ttl: Duration::from_secs(config.catalog_ttl_secs),
            catalog: Mutex::new(None),
        }
    }

    /// The store catalog, fetched again once older than the catalog TTL.
    pub async fn catalog(
        &self,
        force_refresh: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<IapProductListItem>, RpcError> {
        if !force_refresh {
            if let Some(cached) = self.catalog.lock().as_ref() {
                if !cached.products.is_empty() && cached.fetched_at.elapsed() < self.catalog_ttl {
                    return Ok(cached.products.clone());
                }
            }
        }

        let products = self.client.get_product_item_list(cancel).await?.products;
        debug!(count = products.len(), "Product catalog fetched");
        *self.catalog.lock() = Some(CachedCatalog {
            products: products.clone(),
            fetched_at: Instant::now(),
        });
        Ok(products)
    }

    /// `Ok(None)` when the spot is unknown or the store does not list its SKU.
    pub async fn curated_product(
        &self,
        spot_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<CuratedProduct>, RpcError> {
        let Some(spot) = self.spot(spot_id).filter(|s| !s.product_id.trim().is_empty()) else {
            return Ok(None);
        };
        let catalog = self.catalog(false, cancel).await?;
        Ok(catalog
            .into_iter()
            .find(|p| p.sku == spot.product_id)
            .map(|product| CuratedProduct {
                spot: spot.clone(),
                product,
            }))
    }

    pub async fn purchase_curated_spot(
        &self,
        spot_id: &str,
        cancel: &CancellationToken,
    ) -> Result<PurchaseResult, PurchaseError> {
        let spot = self
            .spot(spot_id)
            .ok_or_else(|| PurchaseError::UnknownSpot(spot_id.to_string()))?;
        if spot.product_id.trim().is_empty() {
            return Err(PurchaseError::UnmappedSpot(spot_id.to_string()));
        }
        let sku = spot.product_id.clone();
        self.purchase_sku(&sku, cancel).await
    }

    /// Buy `sku` once. Store-side failures come back as a failed result.
    pub async fn purchase_sku(
        &self,
        sku: &str,
        cancel: &CancellationToken,
    ) -> Result<PurchaseResult, PurchaseError> {
        if sku.trim().is_empty() {
            return Err(PurchaseError::MissingSku);
        }

        let mut events = self.client.purchase_events(sku, cancel.clone());
        let result = loop {
            match events.next().await {
                Some(Ok(PurchaseEvent {
                    kind: Some(PurchaseEventKind::Success(event)),
                })) => break PurchaseResult::succeeded(sku, event),
                Some(Ok(PurchaseEvent {
                    kind: Some(PurchaseEventKind::Error(event)),
                })) => break PurchaseResult::failed(sku, event),
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!(sku, error = %e, "Purchase failed");
                    break PurchaseResult::failed(sku, PurchaseErrorEvent::new("EXCEPTION", e.to_string()));
                }
                None if cancel.is_cancelled() => break PurchaseResult::cancelled(sku),
                None => {
                    break PurchaseResult::failed(
                        sku,
                        PurchaseErrorEvent::new(
                            "EMPTY_RESULT",
                            "Purchase finished without success event.",
                        ),
                    )
                }
            }
        };

        info!(sku, status = ?result.status, "Purchase completed");
        Ok(result)
    }

    fn spot(&self, spot_id: &str) -> Option<&CuratedIapSpot> {
        self.spots.iter().find(|s| s.spot_id == spot_id)
    }
}
