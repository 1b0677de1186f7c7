//! Ads: load and show as long-running operations, plus the engine-side
//! use case that resolves placements and pauses playback.

pub mod engine;
pub mod host;
pub mod messages;

pub use engine::{AdError, AdPlacement, AdResult, AdServiceClient, AdStatus, AdUseCase};
pub use host::{ad_service, AdCallbacks, AdProvider, AdRegistries, ScriptStep, ScriptedAdProvider};
pub use messages::{
    AdLoaded, AdRequest, AdReward, LoadAdEvent, LoadAdEventKind, ShowAdEvent, ShowAdEventKind,
};

pub const AD_SERVICE: &str = "AdService";
pub const LOAD_AD: &str = "LoadAd";
pub const POLL_LOAD_AD_EVENTS: &str = "PollLoadAdEvents";
pub const SHOW_AD: &str = "ShowAd";
pub const POLL_SHOW_AD_EVENTS: &str = "PollShowAdEvents";

/// Only one ad plays at a time on a host.
pub const SHOW_AD_EXCLUSIVE_KEY: &str = "ad-show";
