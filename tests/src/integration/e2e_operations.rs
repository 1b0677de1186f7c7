//! # End-to-End Operation Tests
//!
//! Ads and purchases driven from the engine use cases, through the RPC
//! layer and the loopback transport, into scripted host providers:
//!
//! ```text
//! AdUseCase / IapUseCase
//!         │ Start, Poll, Poll, ...
//!         ↓
//! [engine mux] ══ loopback ══ [host mux]
//!                                 │
//!                                 ↓
//!                   OperationRegistry ← provider callbacks
//! ```
//!
//! ## Test Categories
//!
//! 1. **Happy Path**: ads complete, rewards are granted, purchases succeed
//! 2. **Pausing**: playback is held for exactly as long as someone needs it
//! 3. **Early Exits**: cancellation, unsupported hosts, host contention
//! 4. **Failure Mapping**: SDK and store errors and silent flows become results

#[cfg(test)]
mod tests {
    use super::super::fixtures::{self, SilentStore, STEP};
    use bridge_runtime::features::ad::{
        AdError, AdReward, AdStatus, ScriptStep, ScriptedAdProvider, ShowAdEventKind,
    };
    use bridge_runtime::features::iap::{PurchaseError, PurchaseStatus};
    use hb_05_playback_pause::{PauseChannels, PlaybackTarget};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn scripted() -> ScriptedAdProvider {
        ScriptedAdProvider::new(STEP).with_show_script(
            "rewarded.default",
            ScriptedAdProvider::rewarded_script("coins", 10),
        )
    }

    // =========================================================================
    // HAPPY PATH
    // =========================================================================

    #[tokio::test]
    async fn test_rewarded_ad_grants_reward() {
        let harness = fixtures::start(scripted());
        let cancel = CancellationToken::new();

        let result = harness.runtime.engine.ads.show_rewarded(&cancel).await.unwrap();

        assert_eq!(result.status, AdStatus::Completed);
        assert!(result.is_reward_granted());
        assert_eq!(result.ad_group_id, "rewarded.default");
        // Terminal batch collected, so the host dropped the entry.
        assert!(harness.runtime.host.ad_registries.show.is_empty());
        assert_eq!(harness.runtime.host.ad_registries.show.stats().collected.load(Ordering::Relaxed), 1);

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_interstitial_completes_without_reward() {
        let harness = fixtures::start(scripted());
        let cancel = CancellationToken::new();

        let result = harness
            .runtime
            .engine
            .ads
            .show_interstitial(&cancel)
            .await
            .unwrap();

        assert!(result.is_success());
        assert!(!result.reward_earned);

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_purchase_then_grant_pending_order() {
        let harness = fixtures::start(scripted());
        let engine = &harness.runtime.engine;
        let cancel = CancellationToken::new();

        let result = engine.iap.purchase_sku("sku.gems", &cancel).await.unwrap();
        assert_eq!(result.status, PurchaseStatus::Success);
        let success = result.success.unwrap();
        assert_eq!(success.amount, 1200);
        assert_eq!(success.currency, "KRW");

        let pending = engine.iap_client.get_pending_orders(&cancel).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].order_id, success.order_id);

        assert!(engine
            .iap_client
            .complete_product_grant(&success.order_id, &cancel)
            .await
            .unwrap());
        assert!(engine
            .iap_client
            .get_pending_orders(&cancel)
            .await
            .unwrap()
            .is_empty());

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_curated_spot_resolves_and_purchases() {
        let harness = fixtures::start(scripted());
        let iap = &harness.runtime.engine.iap;
        let cancel = CancellationToken::new();

        let product = iap.curated_product("shop_banner", &cancel).await.unwrap().unwrap();
        assert_eq!(product.product.display_name, "Gem pack");
        assert!(iap.curated_product("nowhere", &cancel).await.unwrap().is_none());

        let result = iap.purchase_curated_spot("shop_banner", &cancel).await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.sku, "sku.gems");

        assert_eq!(
            iap.purchase_curated_spot("nowhere", &cancel).await.unwrap_err(),
            PurchaseError::UnknownSpot("nowhere".into())
        );

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_catalog_cached_until_refresh() {
        let harness = fixtures::start(scripted());
        let iap = &harness.runtime.engine.iap;
        let cancel = CancellationToken::new();

        let first = iap.catalog(false, &cancel).await.unwrap();
        let second = iap.catalog(false, &cancel).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(harness.store.list_calls(), 1);

        iap.catalog(true, &cancel).await.unwrap();
        assert_eq!(harness.store.list_calls(), 2);

        harness.runtime.shutdown().await;
    }

    // =========================================================================
    // PAUSING
    // =========================================================================

    #[tokio::test]
    async fn test_playback_paused_only_while_ad_runs() {
        let harness = fixtures::start(scripted());
        let ads = harness.runtime.engine.ads.clone();
        let cancel = CancellationToken::new();

        let show = tokio::spawn(async move { ads.show_rewarded(&cancel).await });
        tokio::time::sleep(STEP / 2).await;

        assert_eq!(harness.playback.time_scale(), 0.0);
        assert!(harness.playback.audio_paused());
        assert_eq!(harness.runtime.engine.pause.active_reasons(), vec!["Ad:Rewarded"]);

        show.await.unwrap().unwrap();
        assert_eq!(harness.playback.time_scale(), 1.0);
        assert!(!harness.playback.audio_paused());

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_hidden_host_keeps_pause_after_ad() {
        let harness = fixtures::start(scripted());
        let cancel = CancellationToken::new();

        harness.runtime.host.bridge.notify_visibility("hidden").unwrap();
        harness
            .runtime
            .engine
            .ads
            .show_interstitial(&cancel)
            .await
            .unwrap();

        // The ad's hold is gone, the visibility hold is not.
        assert_eq!(harness.runtime.engine.pause.reference_count(PauseChannels::TIME), 1);
        assert_eq!(harness.playback.time_scale(), 0.0);

        harness.runtime.host.bridge.notify_visibility("visible").unwrap();
        assert_eq!(harness.playback.time_scale(), 1.0);

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_ad_pause_respects_configured_channels() {
        let mut config = fixtures::config();
        config.monetization.mute_audio_during_ads = false;
        let harness = fixtures::start_with(&config, scripted(), None);
        let ads = harness.runtime.engine.ads.clone();

        let show = tokio::spawn(async move { ads.show_interstitial(&CancellationToken::new()).await });
        tokio::time::sleep(STEP / 2).await;
        assert_eq!(harness.playback.time_scale(), 0.0);
        assert!(!harness.playback.audio_paused());

        show.await.unwrap().unwrap();
        harness.runtime.shutdown().await;
    }

    // =========================================================================
    // EARLY EXITS
    // =========================================================================

    #[tokio::test]
    async fn test_second_ad_rejected_while_one_plays() {
        let harness = fixtures::start(scripted());
        let ads = harness.runtime.engine.ads.clone();

        let first = tokio::spawn(async move { ads.show_interstitial(&CancellationToken::new()).await });
        tokio::time::sleep(STEP / 2).await;

        let second = harness
            .runtime
            .engine
            .ads
            .show_rewarded(&CancellationToken::new())
            .await;
        assert_eq!(second.unwrap_err(), AdError::AlreadyPlaying);

        assert!(first.await.unwrap().unwrap().is_success());
        assert!(!harness.runtime.engine.ads.is_ad_playing());

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_cancelled_ad_restores_playback() {
        let harness = fixtures::start(scripted());
        let ads = harness.runtime.engine.ads.clone();

        let show = tokio::spawn(async move { ads.show_rewarded(&CancellationToken::new()).await });
        tokio::time::sleep(STEP / 2).await;
        assert!(harness.runtime.engine.ads.cancel_active());

        let result = show.await.unwrap().unwrap();
        assert_eq!(result.status, AdStatus::Cancelled);
        assert!(!result.is_reward_granted());
        assert_eq!(harness.playback.time_scale(), 1.0);
        assert!(harness.runtime.engine.pause.active_reasons().is_empty());

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_host_contention_until_abandoned_ad_ends() {
        let harness = fixtures::start(scripted());
        let engine = &harness.runtime.engine;
        let ads = engine.ads.clone();

        let show = tokio::spawn(async move { ads.show_interstitial(&CancellationToken::new()).await });
        tokio::time::sleep(STEP / 2).await;
        engine.ads.cancel_active();
        show.await.unwrap().unwrap();

        // The host is still playing the abandoned ad.
        let blocked = engine.ads.show_interstitial(&CancellationToken::new()).await.unwrap();
        assert_eq!(blocked.status, AdStatus::FailedToShow);

        tokio::time::sleep(STEP * 8).await;
        let retried = engine.ads.show_interstitial(&CancellationToken::new()).await.unwrap();
        assert_eq!(retried.status, AdStatus::Completed);

        // The abandoned flow was never collected.
        assert_eq!(harness.runtime.host.ad_registries.show.len(), 1);

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_unsupported_host_fails_to_show() {
        let harness = fixtures::start(ScriptedAdProvider::unsupported());

        let result = harness
            .runtime
            .engine
            .ads
            .show_rewarded(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.status, AdStatus::FailedToShow);
        assert_eq!(harness.runtime.host.live_operations(), 0);
        assert_eq!(harness.playback.time_scale(), 1.0);

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_unconfigured_placement_never_calls_host() {
        let mut config = fixtures::config();
        config.monetization.rewarded_ad_group_id = String::new();
        let harness = fixtures::start_with(&config, scripted(), None);

        let err = harness
            .runtime
            .engine
            .ads
            .show_rewarded(&CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AdError::NotConfigured(_)));
        assert_eq!(harness.runtime.host.ad_registries.show.stats().started.load(Ordering::Relaxed), 0);

        harness.runtime.shutdown().await;
    }

    // =========================================================================
    // FAILURE MAPPING
    // =========================================================================

    #[tokio::test]
    async fn test_failed_to_show_event() {
        let provider = ScriptedAdProvider::new(STEP).with_show_script(
            "interstitial.default",
            vec![
                ScriptStep::Event(ShowAdEventKind::Requested),
                ScriptStep::Event(ShowAdEventKind::FailedToShow),
            ],
        );
        let harness = fixtures::start(provider);

        let result = harness
            .runtime
            .engine
            .ads
            .show_interstitial(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.status, AdStatus::FailedToShow);

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_sdk_error_mid_ad_fails_to_show() {
        let provider = ScriptedAdProvider::new(STEP).with_show_script(
            "interstitial.default",
            vec![
                ScriptStep::Event(ShowAdEventKind::Show),
                ScriptStep::Error("renderer crashed".into()),
            ],
        );
        let harness = fixtures::start(provider);

        let result = harness
            .runtime
            .engine
            .ads
            .show_interstitial(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.status, AdStatus::FailedToShow);
        assert!(!result.is_success());
        assert!(!harness.runtime.engine.pause.is_paused(PauseChannels::TIME));

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_sdk_error_after_reward_forfeits_reward() {
        let provider = ScriptedAdProvider::new(STEP).with_show_script(
            "rewarded.default",
            vec![
                ScriptStep::Event(ShowAdEventKind::Show),
                ScriptStep::Event(ShowAdEventKind::UserEarnedReward(AdReward {
                    unit_type: "coins".into(),
                    unit_amount: 10,
                })),
                ScriptStep::Error("renderer crashed".into()),
            ],
        );
        let harness = fixtures::start(provider);

        let result = harness
            .runtime
            .engine
            .ads
            .show_rewarded(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.status, AdStatus::FailedToShow);
        assert!(!result.reward_earned);
        assert!(!result.is_reward_granted());
        assert!(!harness.runtime.engine.ads.is_ad_playing());

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_declined_purchase_fails_with_store_code() {
        let harness = fixtures::start(scripted());

        let result = harness
            .runtime
            .engine
            .iap
            .purchase_sku("sku.remove_ads", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.status, PurchaseStatus::Failed);
        assert_eq!(result.error.unwrap().error_code, "USER_CANCELED");

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_sku_reported_by_store() {
        let harness = fixtures::start(scripted());

        let result = harness
            .runtime
            .engine
            .iap
            .purchase_sku("sku.missing", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.error.unwrap().error_code, "PRODUCT_NOT_FOUND");

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_silent_purchase_is_empty_result() {
        let harness = fixtures::start_with(&fixtures::config(), scripted(), Some(Arc::new(SilentStore)));

        let result = harness
            .runtime
            .engine
            .iap
            .purchase_sku("sku.gems", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.status, PurchaseStatus::Failed);
        let error = result.error.unwrap();
        assert_eq!(error.error_code, "EMPTY_RESULT");
        assert_eq!(error.error_message, "Purchase finished without success event.");

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_cancelled_purchase() {
        let harness = fixtures::start(scripted());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = harness
            .runtime
            .engine
            .iap
            .purchase_sku("sku.gems", &cancel)
            .await
            .unwrap();
        assert_eq!(result.status, PurchaseStatus::Cancelled);

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_empty_sku_rejected_locally() {
        let harness = fixtures::start(scripted());
        let err = harness
            .runtime
            .engine
            .iap
            .purchase_sku("  ", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, PurchaseError::MissingSku);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(harness.runtime.host.purchases.stats().started.load(Ordering::Relaxed), 0);
        harness.runtime.shutdown().await;
    }
}
