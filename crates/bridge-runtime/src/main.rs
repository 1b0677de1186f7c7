//! # Bridge Runtime
//!
//! Runs the engine side and the host side in one process over the loopback
//! transport, with scripted ad and store providers, and walks through each
//! feature once.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (`HB_CONFIG` file, then environment)
//! 2. Install logging
//! 3. Wire both sides and start their tasks
//! 4. Run the feature walkthrough
//! 5. Wait for Ctrl+C, unless started with `--once`

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use bridge_runtime::features::ad::ScriptedAdProvider;
use bridge_runtime::features::iap::{IapProductListItem, InMemoryStore};
use bridge_runtime::features::storage::InMemoryKeyValueStore;
use bridge_runtime::{load_config, logging, BridgeConfig, HostProviders, LoopbackRuntime};
use hb_05_playback_pause::{InMemoryPlayback, PlaybackTarget};
use tokio_util::sync::CancellationToken;

fn demo_providers(config: &BridgeConfig) -> HostProviders {
    let ads = ScriptedAdProvider::new(Duration::from_millis(50)).with_show_script(
        config.monetization.rewarded_ad_group_id.clone(),
        ScriptedAdProvider::rewarded_script("coins", 25),
    );

    let mut catalog = vec![IapProductListItem {
        sku: "sku.gems.small".to_string(),
        display_name: "Handful of gems".to_string(),
        display_amount: "1,200".to_string(),
        ..Default::default()
    }];
    catalog.extend(config.monetization.product_ids().map(|sku| IapProductListItem {
        sku: sku.to_string(),
        display_name: sku.to_string(),
        display_amount: "3,300".to_string(),
        ..Default::default()
    }));

    HostProviders {
        ads: Arc::new(ads),
        purchases: Arc::new(InMemoryStore::new(catalog, Duration::from_millis(20))),
        storage: Arc::new(InMemoryKeyValueStore::new()),
    }
}

async fn walkthrough(runtime: &LoopbackRuntime, playback: &InMemoryPlayback) -> Result<()> {
    let engine = &runtime.engine;
    let cancel = runtime.shutdown_token();

    let interstitial = engine.ads.show_interstitial(&cancel).await?;
    info!(status = ?interstitial.status, "Interstitial done");

    let rewarded = engine.ads.show_rewarded(&cancel).await?;
    info!(
        status = ?rewarded.status,
        reward_granted = rewarded.is_reward_granted(),
        "Rewarded ad done"
    );

    let catalog = engine.iap.catalog(false, &cancel).await?;
    info!(products = catalog.len(), "Catalog loaded");
    let purchase = engine.iap.purchase_sku("sku.gems.small", &cancel).await?;
    info!(status = ?purchase.status, "Purchase done");

    for order in engine.iap_client.get_pending_orders(&cancel).await? {
        let granted = engine
            .iap_client
            .complete_product_grant(&order.order_id, &cancel)
            .await?;
        info!(order_id = %order.order_id, sku = %order.sku, granted, "Order granted");
    }

    engine.storage.set_item("last_session", "walkthrough").await?;
    let stored = engine.storage.get_item("last_session").await?;
    info!(value = ?stored, "Storage read back");

    runtime.host.bridge.notify_visibility("hidden")?;
    info!(time_scale = playback.time_scale(), "Host hidden");
    runtime.host.bridge.notify_visibility("visible")?;
    info!(time_scale = playback.time_scale(), "Host visible");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config().context("loading configuration")?;
    logging::init(&config.logging).context("installing logging")?;

    let playback = Arc::new(InMemoryPlayback::default());
    let runtime = LoopbackRuntime::start(&config, playback.clone(), demo_providers(&config))
        .context("registering host services")?;

    if let Err(e) = walkthrough(&runtime, &playback).await {
        warn!(error = %e, "Walkthrough failed");
    }

    let once = std::env::args().skip(1).any(|arg| arg == "--once");
    if !once {
        info!("Bridge is running. Press Ctrl+C to stop.");
        let ctrl_c = tokio::signal::ctrl_c();
        let shutdown: CancellationToken = runtime.shutdown_token();
        tokio::select! {
            result = ctrl_c => result.context("waiting for Ctrl+C")?,
            _ = shutdown.cancelled() => {}
        }
    }

    runtime.shutdown().await;
    Ok(())
}
