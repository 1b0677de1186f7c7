//! # Runtime Wiring
//!
//! Builds each side of the bridge from a [`BridgeConfig`]:
//!
//! ```text
//! EngineContext                              HostContext
//! ├── EngineBridge ◄──── loopback ─────────► HostBridge
//! ├── RpcMultiplexer (no services)           ├── RpcMultiplexer
//! ├── OperationClient                        │   ├── AdService
//! ├── PauseCoordinator                       │   ├── IapService
//! │   └── VisibilityPauseController          │   └── StorageService
//! ├── AdUseCase                              └── operation registries
//! ├── IapUseCase                                 (swept for idle entries)
//! └── StorageClient
//! ```
//!
//! Both contexts are transport-agnostic; [`LoopbackRuntime`] connects the
//! two in one process.

use crate::config::BridgeConfig;
use crate::features::ad::{ad_service, AdProvider, AdRegistries, AdServiceClient, AdUseCase};
use crate::features::iap::{
    iap_service, IapServiceClient, IapUseCase, PurchaseEvent, PurchaseProvider,
};
use crate::features::storage::{storage_service, KeyValueStore, StorageClient};
use hb_02_transport_bridge::{connect_loopback, EngineBridge, HostBridge, LoopbackLink};
use hb_03_rpc_multiplexer::{RegistryError, RpcMultiplexer};
use hb_04_operation_registry::{sweep_task, OperationClient, OperationRegistry};
use hb_05_playback_pause::{PauseCoordinator, PlaybackTarget, VisibilityPauseController};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Everything the engine side owns.
pub struct EngineContext {
    pub bridge: Arc<EngineBridge>,
    pub mux: Arc<RpcMultiplexer>,
    pub operations: OperationClient,
    pub pause: PauseCoordinator,
    pub visibility: Arc<VisibilityPauseController>,
    pub ads: Arc<AdUseCase>,
    pub iap_client: IapServiceClient,
    pub iap: Arc<IapUseCase>,
    pub storage: StorageClient,
}

impl EngineContext {
    pub fn new(config: &BridgeConfig, playback: Arc<dyn PlaybackTarget>) -> Self {
        let bridge = Arc::new(EngineBridge::new(config.transport.clone()));
        let mux = RpcMultiplexer::new(bridge.clone(), config.rpc.clone());
        let operations = OperationClient::new(mux.clone(), config.operations.poll_interval());

        let pause = PauseCoordinator::new(playback);
        let visibility = Arc::new(VisibilityPauseController::new(
            pause.clone(),
            config.monetization.hidden_pause_channels(),
        ));
        let controller = visibility.clone();
        bridge.register_entrypoint(
            config.transport.visibility_method.clone(),
            Arc::new(move |state: &str| {
                if let Err(e) = controller.on_signal(state) {
                    warn!(error = %e, "Ignoring visibility signal");
                }
            }),
        );

        let ads = Arc::new(AdUseCase::new(
            AdServiceClient::new(operations.clone()),
            pause.clone(),
            &config.monetization,
        ));
        let iap_client = IapServiceClient::new(mux.clone(), operations.clone());
        let iap = Arc::new(IapUseCase::new(iap_client.clone(), &config.monetization));
        let storage = StorageClient::new(mux.clone());

        Self {
            bridge,
            mux,
            operations,
            pause,
            visibility,
            ads,
            iap_client,
            iap,
            storage,
        }
    }

    /// Start consuming inbound responses.
    pub fn start(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        self.mux.start(shutdown)
    }
}

/// Platform SDKs the host services delegate to.
#[derive(Clone)]
pub struct HostProviders {
    pub ads: Arc<dyn AdProvider>,
    pub purchases: Arc<dyn PurchaseProvider>,
    pub storage: Arc<dyn KeyValueStore>,
}

/// Everything the host side owns.
pub struct HostContext {
    pub bridge: Arc<HostBridge>,
    pub mux: Arc<RpcMultiplexer>,
    pub ad_registries: AdRegistries,
    pub purchases: Arc<OperationRegistry<PurchaseEvent>>,
    sweep_interval: Duration,
}

impl HostContext {
    /// Build the host side and register its services.
    pub fn new(config: &BridgeConfig, providers: HostProviders) -> Result<Self, RegistryError> {
        let bridge = Arc::new(HostBridge::new(config.transport.clone()));
        let mux = RpcMultiplexer::new(bridge.clone(), config.rpc.clone());

        let ttl = config.operations.ttl();
        let ad_registries = AdRegistries::new(ttl);
        let purchases = OperationRegistry::new(ttl);

        mux.register_service(ad_service(&ad_registries, providers.ads))?;
        mux.register_service(iap_service(purchases.clone(), providers.purchases))?;
        mux.register_service(storage_service(providers.storage))?;

        Ok(Self {
            bridge,
            mux,
            ad_registries,
            purchases,
            sweep_interval: config.operations.sweep_interval(),
        })
    }

    /// Start serving requests and sweeping idle operations.
    pub fn start(&self, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        vec![
            self.mux.start(shutdown.clone()),
            tokio::spawn(sweep_task(
                self.ad_registries.load.clone(),
                self.sweep_interval,
                shutdown.clone(),
            )),
            tokio::spawn(sweep_task(
                self.ad_registries.show.clone(),
                self.sweep_interval,
                shutdown.clone(),
            )),
            tokio::spawn(sweep_task(
                self.purchases.clone(),
                self.sweep_interval,
                shutdown,
            )),
        ]
    }

    /// Operations still held by any registry.
    pub fn live_operations(&self) -> usize {
        self.ad_registries.load.len() + self.ad_registries.show.len() + self.purchases.len()
    }
}

/// Both sides in one process over a loopback link.
pub struct LoopbackRuntime {
    pub engine: EngineContext,
    pub host: HostContext,
    pub link: LoopbackLink,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl LoopbackRuntime {
    /// Build, connect and start both sides. Must run inside a tokio runtime.
    pub fn start(
        config: &BridgeConfig,
        playback: Arc<dyn PlaybackTarget>,
        providers: HostProviders,
    ) -> Result<Self, RegistryError> {
        let engine = EngineContext::new(config, playback);
        let host = HostContext::new(config, providers)?;
        let link = connect_loopback(&engine.bridge, &host.bridge);

        let shutdown = CancellationToken::new();
        let mut tasks = host.start(shutdown.child_token());
        tasks.push(engine.start(shutdown.child_token()));

        info!("Loopback runtime started");
        Ok(Self {
            engine,
            host,
            link,
            shutdown,
            tasks,
        })
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop every task and wait for them to exit.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Runtime task ended abnormally");
            }
        }
        info!("Loopback runtime stopped");
    }
}
