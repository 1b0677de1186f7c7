//! # Transport and RPC Flows
//!
//! Plain request/response behaviour across the loopback link, using the
//! storage service as the workload:
//!
//! 1. **Round Trips**: every storage method, many calls in flight
//! 2. **Lost Messages**: a severed link times calls out, then recovers
//! 3. **Protocol Faults**: unknown methods, bad payloads, no peer

#[cfg(test)]
mod tests {
    use super::super::fixtures::{self, STEP};
    use bridge_runtime::features::ad::{ScriptedAdProvider, ShowAdEvent};
    use bridge_runtime::EngineContext;
    use futures::future::join_all;
    use hb_03_rpc_multiplexer::codes;
    use hb_05_playback_pause::InMemoryPlayback;
    use shared_types::{ErrorKind, OperationId};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tokio_util::sync::CancellationToken;

    // =========================================================================
    // ROUND TRIPS
    // =========================================================================

    #[tokio::test]
    async fn test_storage_methods_end_to_end() {
        let harness = fixtures::start(ScriptedAdProvider::new(STEP));
        let storage = &harness.runtime.engine.storage;

        storage.set_item("a", "1").await.unwrap();
        storage.set_item("b", "2").await.unwrap();
        assert_eq!(storage.get_item("a").await.unwrap().as_deref(), Some("1"));

        storage.remove_item("a").await.unwrap();
        assert_eq!(storage.get_item("a").await.unwrap(), None);
        assert_eq!(storage.get_item("b").await.unwrap().as_deref(), Some("2"));

        storage.clear_items().await.unwrap();
        assert_eq!(storage.get_item("b").await.unwrap(), None);

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_concurrent_calls_get_their_own_answers() {
        let harness = fixtures::start(ScriptedAdProvider::new(STEP));
        let storage = &harness.runtime.engine.storage;

        for i in 0..50 {
            storage.set_item(&format!("key-{i}"), &format!("value-{i}")).await.unwrap();
        }

        let reads = join_all((0..50).map(|i| {
            let storage = storage.clone();
            async move { (i, storage.get_item(&format!("key-{i}")).await.unwrap()) }
        }))
        .await;

        for (i, value) in reads {
            assert_eq!(value, Some(format!("value-{i}")));
        }
        assert_eq!(harness.runtime.engine.mux.pending().pending_count(), 0);

        harness.runtime.shutdown().await;
    }

    // =========================================================================
    // LOST MESSAGES
    // =========================================================================

    #[tokio::test]
    async fn test_lost_request_times_out_then_recovers() {
        let harness = fixtures::start(ScriptedAdProvider::new(STEP));
        let runtime = &harness.runtime;

        runtime.link.sever();
        let started = Instant::now();
        let err = runtime.engine.storage.get_item("slot").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(started.elapsed() >= Duration::from_millis(150));
        assert!(runtime.link.lost() >= 1);
        assert_eq!(runtime.engine.mux.pending().pending_count(), 0);

        runtime.link.reconnect();
        runtime.engine.storage.set_item("slot", "back").await.unwrap();
        assert_eq!(
            runtime.engine.storage.get_item("slot").await.unwrap().as_deref(),
            Some("back")
        );

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_cancelled_call_returns_promptly() {
        let harness = fixtures::start(ScriptedAdProvider::new(STEP));
        harness.runtime.link.sever();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = harness
            .runtime
            .engine
            .iap_client
            .get_product_item_list(&cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(started.elapsed() < Duration::from_millis(150));

        harness.runtime.shutdown().await;
    }

    // =========================================================================
    // PROTOCOL FAULTS
    // =========================================================================

    #[tokio::test]
    async fn test_unknown_method_is_protocol_error() {
        let harness = fixtures::start(ScriptedAdProvider::new(STEP));

        let err = harness
            .runtime
            .engine
            .mux
            .call::<(), ()>("NoSuchService.Method", &())
            .await
            .unwrap_err();
        assert_eq!(err.code, codes::METHOD_NOT_FOUND);
        assert_eq!(err.kind(), ErrorKind::Protocol);

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_poll_unknown_operation_reports_finished() {
        let harness = fixtures::start(ScriptedAdProvider::new(STEP));
        let cancel = CancellationToken::new();

        let response = harness
            .runtime
            .engine
            .operations
            .poll::<ShowAdEvent>("AdService.PollShowAdEvents", &OperationId::generate(), &cancel)
            .await
            .unwrap();
        assert!(response.is_finished);
        assert!(response.events.is_empty());
        assert_eq!(
            harness
                .runtime
                .host
                .ad_registries
                .show
                .stats()
                .unknown_polls
                .load(Ordering::Relaxed),
            1
        );

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_garbage_payload_dropped_without_breaking_link() {
        let config = fixtures::config();
        let harness = fixtures::start_with(&config, ScriptedAdProvider::new(STEP), None);
        let runtime = &harness.runtime;

        runtime
            .host
            .bridge
            .invoke_engine(&config.transport.entrypoint_method, "%%% not base64")
            .unwrap();
        assert_eq!(runtime.engine.bridge.stats().dropped(), 1);

        runtime.engine.storage.set_item("k", "v").await.unwrap();
        assert_eq!(runtime.engine.storage.get_item("k").await.unwrap().as_deref(), Some("v"));

        harness.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_no_host_fails_fast() {
        let engine = EngineContext::new(&fixtures::config(), Arc::new(InMemoryPlayback::default()));

        let started = Instant::now();
        let err = engine.storage.get_item("slot").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportUnavailable);
        assert!(started.elapsed() < Duration::from_millis(50));
        assert_eq!(engine.bridge.stats().sent(), 0);
    }

    #[tokio::test]
    async fn test_unknown_visibility_state_ignored() {
        let harness = fixtures::start(ScriptedAdProvider::new(STEP));

        harness.runtime.host.bridge.notify_visibility("minimized").unwrap();
        assert!(!harness.runtime.engine.visibility.is_holding());
        assert!(harness.runtime.engine.pause.active_reasons().is_empty());

        harness.runtime.shutdown().await;
    }
}
