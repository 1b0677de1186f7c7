//! Shared builders for the integration tests.

use async_trait::async_trait;
use bridge_runtime::features::ad::ScriptedAdProvider;
use bridge_runtime::features::iap::{
    IapProductListItem, InMemoryStore, PendingOrder, PurchaseCallbacks, PurchaseProvider,
};
use bridge_runtime::features::storage::InMemoryKeyValueStore;
use bridge_runtime::{BridgeConfig, CuratedIapSpot, HostProviders, LoopbackRuntime};
use hb_04_operation_registry::StartError;
use hb_05_playback_pause::InMemoryPlayback;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const STEP: Duration = Duration::from_millis(20);

pub fn config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.operations.poll_interval_ms = 5;
    config.rpc.call_timeout_ms = 200;
    config.rpc.sweep_interval_ms = 20;
    config.monetization.curated_iap_spots = vec![CuratedIapSpot {
        spot_id: "shop_banner".into(),
        product_id: "sku.gems".into(),
        ..Default::default()
    }];
    config
}

pub fn catalog() -> Vec<IapProductListItem> {
    vec![
        IapProductListItem {
            sku: "sku.gems".into(),
            display_name: "Gem pack".into(),
            display_amount: "1,200".into(),
            ..Default::default()
        },
        IapProductListItem {
            sku: "sku.remove_ads".into(),
            display_name: "Remove ads".into(),
            display_amount: "5,500".into(),
            ..Default::default()
        },
    ]
}

/// Store wrapper counting catalog fetches.
pub struct CountingStore {
    inner: InMemoryStore,
    pub list_calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PurchaseProvider for CountingStore {
    async fn product_items(&self) -> Option<Vec<IapProductListItem>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.product_items().await
    }

    async fn create_one_time_purchase_order(
        &self,
        sku: &str,
        callbacks: PurchaseCallbacks,
    ) -> Result<(), StartError> {
        self.inner.create_one_time_purchase_order(sku, callbacks).await
    }

    async fn pending_orders(&self) -> Vec<PendingOrder> {
        self.inner.pending_orders().await
    }

    async fn complete_product_grant(&self, order_id: &str) -> bool {
        self.inner.complete_product_grant(order_id).await
    }
}

/// Store whose purchase flow ends without reporting anything.
pub struct SilentStore;

#[async_trait]
impl PurchaseProvider for SilentStore {
    async fn product_items(&self) -> Option<Vec<IapProductListItem>> {
        None
    }

    async fn create_one_time_purchase_order(
        &self,
        _sku: &str,
        callbacks: PurchaseCallbacks,
    ) -> Result<(), StartError> {
        callbacks.on_other();
        Ok(())
    }

    async fn pending_orders(&self) -> Vec<PendingOrder> {
        Vec::new()
    }

    async fn complete_product_grant(&self, _order_id: &str) -> bool {
        false
    }
}

pub struct Harness {
    pub runtime: LoopbackRuntime,
    pub playback: Arc<InMemoryPlayback>,
    pub store: Arc<CountingStore>,
}

pub fn start_with(
    config: &BridgeConfig,
    ads: ScriptedAdProvider,
    purchases: Option<Arc<dyn PurchaseProvider>>,
) -> Harness {
    let playback = Arc::new(InMemoryPlayback::default());
    let store = Arc::new(CountingStore::new(
        InMemoryStore::new(catalog(), Duration::from_millis(5)).decline("sku.remove_ads"),
    ));
    let providers = HostProviders {
        ads: Arc::new(ads),
        purchases: purchases.unwrap_or_else(|| store.clone() as Arc<dyn PurchaseProvider>),
        storage: Arc::new(InMemoryKeyValueStore::new()),
    };
    let runtime = LoopbackRuntime::start(config, playback.clone(), providers).unwrap();
    Harness {
        runtime,
        playback,
        store,
    }
}

pub fn start(ads: ScriptedAdProvider) -> Harness {
    start_with(&config(), ads, None)
}
