//! # Bridge Configuration
//!
//! One document for both sides of the bridge. Every section has defaults,
//! so an empty file (or no file) is a valid configuration.
//!
//! ## Sources
//!
//! 1. Built-in defaults
//! 2. JSON file named by `HB_CONFIG`, if set
//! 3. Environment overrides (`HB_LOG_LEVEL`, `HB_CALL_TIMEOUT_MS`,
//!    `HB_OPERATION_TTL_SECS`, `HB_POLL_INTERVAL_MS`,
//!    `HB_INTERSTITIAL_AD_GROUP`, `HB_REWARDED_AD_GROUP`)
//!
//! The result is validated before anything is wired.

use hb_02_transport_bridge::TransportConfig;
use hb_03_rpc_multiplexer::RpcConfig;
use hb_04_operation_registry::OperationConfig;
use hb_05_playback_pause::PauseChannels;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Environment variable naming the JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "HB_CONFIG";

/// Complete bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Names shared by both sides of the transport
    pub transport: TransportConfig,
    /// Call timeouts and pending-call sweeping
    pub rpc: RpcConfig,
    /// Operation TTL and poll cadence
    pub operations: OperationConfig,
    /// Ad groups, purchase spots and pause behaviour
    pub monetization: MonetizationConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Ad placements, curated purchase spots and pause switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonetizationConfig {
    pub interstitial_ad_group_id: String,
    pub rewarded_ad_group_id: String,
    /// UI placements mapped to purchasable SKUs
    pub curated_iap_spots: Vec<CuratedIapSpot>,
    pub pause_time_during_ads: bool,
    pub mute_audio_during_ads: bool,
    pub pause_time_when_host_hidden: bool,
    pub mute_audio_when_host_hidden: bool,
    /// How long a fetched product catalog stays fresh
    pub catalog_ttl_secs: u64,
}

impl Default for MonetizationConfig {
    fn default() -> Self {
        Self {
            interstitial_ad_group_id: "interstitial.default".to_string(),
            rewarded_ad_group_id: "rewarded.default".to_string(),
            curated_iap_spots: Vec::new(),
            pause_time_during_ads: true,
            mute_audio_during_ads: true,
            pause_time_when_host_hidden: true,
            mute_audio_when_host_hidden: true,
            catalog_ttl_secs: 120,
        }
    }
}

impl MonetizationConfig {
    pub fn ad_pause_channels(&self) -> PauseChannels {
        PauseChannels::from_flags(self.pause_time_during_ads, self.mute_audio_during_ads)
    }

    pub fn hidden_pause_channels(&self) -> PauseChannels {
        PauseChannels::from_flags(
            self.pause_time_when_host_hidden,
            self.mute_audio_when_host_hidden,
        )
    }

    pub fn curated_spot(&self, spot_id: &str) -> Option<&CuratedIapSpot> {
        self.curated_iap_spots.iter().find(|s| s.spot_id == spot_id)
    }

    /// SKUs referenced by curated spots, for prefetching.
    pub fn product_ids(&self) -> impl Iterator<Item = &str> {
        self.curated_iap_spots
            .iter()
            .map(|s| s.product_id.as_str())
            .filter(|id| !id.trim().is_empty())
    }
}

/// How one SKU is presented at one place in the game UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuratedIapSpot {
    /// Local identifier used by UI code, never shown to players
    pub spot_id: String,
    /// SKU bought when the spot is used
    pub product_id: String,
    pub title_override: String,
    pub subtitle: String,
    pub call_to_action_override: String,
}

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `hb_03_rpc_multiplexer=debug`
    pub level: String,
    pub with_target: bool,
    pub with_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: true,
            with_thread_ids: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },
    #[error("invalid timing: {0}")]
    InvalidTiming(String),
    #[error("invalid name: {0}")]
    InvalidName(String),
}

impl BridgeConfig {
    /// Parse a JSON document; missing sections keep their defaults.
    pub fn from_json(text: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text, path)
    }

    /// Apply overrides from `lookup`, normally the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("HB_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(value) = lookup("HB_CALL_TIMEOUT_MS") {
            self.rpc.call_timeout_ms = parse_env("HB_CALL_TIMEOUT_MS", value)?;
        }
        if let Some(value) = lookup("HB_OPERATION_TTL_SECS") {
            self.operations.ttl_secs = parse_env("HB_OPERATION_TTL_SECS", value)?;
        }
        if let Some(value) = lookup("HB_POLL_INTERVAL_MS") {
            self.operations.poll_interval_ms = parse_env("HB_POLL_INTERVAL_MS", value)?;
        }
        if let Some(group) = lookup("HB_INTERSTITIAL_AD_GROUP") {
            self.monetization.interstitial_ad_group_id = group;
        }
        if let Some(group) = lookup("HB_REWARDED_AD_GROUP") {
            self.monetization.rewarded_ad_group_id = group;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let transport = &self.transport;
        for (field, value) in [
            ("transport.event_name", &transport.event_name),
            ("transport.entrypoint_object", &transport.entrypoint_object),
            ("transport.entrypoint_method", &transport.entrypoint_method),
            ("transport.visibility_method", &transport.visibility_method),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidName(format!("{field} cannot be empty")));
            }
        }
        if transport.entrypoint_method == transport.visibility_method {
            return Err(ConfigError::InvalidName(
                "entrypoint_method and visibility_method must differ".into(),
            ));
        }

        if self.rpc.sweep_interval_ms == 0 {
            return Err(ConfigError::InvalidTiming(
                "rpc.sweep_interval_ms cannot be 0".into(),
            ));
        }
        if self.operations.ttl_secs == 0 {
            return Err(ConfigError::InvalidTiming(
                "operations.ttl_secs cannot be 0".into(),
            ));
        }
        if self.operations.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidTiming(
                "operations.sweep_interval_secs cannot be 0".into(),
            ));
        }
        if self.operations.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidTiming(
                "operations.poll_interval_ms cannot be 0".into(),
            ));
        }

        let spots = &self.monetization.curated_iap_spots;
        for (i, spot) in spots.iter().enumerate() {
            if spot.spot_id.trim().is_empty() {
                return Err(ConfigError::InvalidName(format!(
                    "curated_iap_spots[{i}].spot_id cannot be empty"
                )));
            }
            if spots[..i].iter().any(|s| s.spot_id == spot.spot_id) {
                return Err(ConfigError::InvalidName(format!(
                    "duplicate curated spot {}",
                    spot.spot_id
                )));
            }
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

/// Load configuration from `HB_CONFIG` and the environment, then validate.
pub fn load_config() -> Result<BridgeConfig, ConfigError> {
    let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
        Some(path) => {
            let path = PathBuf::from(path);
            let config = BridgeConfig::from_file(&path)?;
            info!(path = %path.display(), "Loaded configuration file");
            config
        }
        None => BridgeConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}
