//! # Bridge Runtime
//!
//! Puts the bridge layers together and runs them:
//!
//! - `config`: one JSON document plus environment overrides for both sides
//! - `logging`: `tracing` subscriber setup
//! - `features`: the host services (ads, purchases, storage) with their
//!   engine-side clients and use cases
//! - `context`: builds the engine side, the host side, and a loopback
//!   runtime holding both
//!
//! ## Feature Flow
//!
//! ```text
//! AdUseCase::show_rewarded()
//!   ├── PauseCoordinator::acquire(ALL, "Ad:Rewarded")
//!   ├── OperationClient::events("AdService.ShowAd", "AdService.PollShowAdEvents")
//!   │     └── RpcMultiplexer ── EngineBridge ══ HostBridge ── RpcMultiplexer
//!   │                                                           └── AdService
//!   │                                                                └── AdProvider
//!   └── PauseHandle dropped: playback restored
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![deny(unsafe_code)]

pub mod config;
pub mod context;
pub mod features;
pub mod logging;

pub use config::{
    load_config, BridgeConfig, ConfigError, CuratedIapSpot, LoggingConfig, MonetizationConfig,
};
pub use context::{EngineContext, HostContext, HostProviders, LoopbackRuntime};
