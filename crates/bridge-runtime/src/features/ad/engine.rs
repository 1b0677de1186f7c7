//! Engine side of the ad feature.

use super::messages::{AdRequest, LoadAdEvent, ShowAdEvent, ShowAdEventKind};
use super::{AD_SERVICE, LOAD_AD, POLL_LOAD_AD_EVENTS, POLL_SHOW_AD_EVENTS, SHOW_AD};
use crate::config::MonetizationConfig;
use futures::stream::{BoxStream, StreamExt};
use hb_03_rpc_multiplexer::method_selector;
use hb_04_operation_registry::{OperationClient, OperationError};
use hb_05_playback_pause::{PauseChannels, PauseCoordinator};
use parking_lot::Mutex;
use std::fmt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Typed client for the AdService long-running methods.
#[derive(Clone)]
pub struct AdServiceClient {
    operations: OperationClient,
}

impl AdServiceClient {
    pub fn new(operations: OperationClient) -> Self {
        Self { operations }
    }

    pub fn load_ad_events(
        &self,
        request: AdRequest,
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<LoadAdEvent, OperationError>> {
        self.operations.events(
            &method_selector(AD_SERVICE, LOAD_AD),
            &method_selector(AD_SERVICE, POLL_LOAD_AD_EVENTS),
            request,
            cancel,
        )
    }

    pub fn show_ad_events(
        &self,
        request: AdRequest,
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<ShowAdEvent, OperationError>> {
        self.operations.events(
            &method_selector(AD_SERVICE, SHOW_AD),
            &method_selector(AD_SERVICE, POLL_SHOW_AD_EVENTS),
            request,
            cancel,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdPlacement {
    Interstitial,
    Rewarded,
}

impl fmt::Display for AdPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interstitial => write!(f, "Interstitial"),
            Self::Rewarded => write!(f, "Rewarded"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdStatus {
    Completed,
    FailedToShow,
    Cancelled,
}

/// Outcome of one ad placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdResult {
    pub placement: AdPlacement,
    pub ad_group_id: String,
    pub status: AdStatus,
    pub reward_earned: bool,
}

impl AdResult {
    pub fn is_success(&self) -> bool {
        self.status == AdStatus::Completed
    }

    /// A reward only counts if the ad also completed.
    pub fn is_reward_granted(&self) -> bool {
        self.reward_earned && self.is_success()
    }
}

/// Why an ad could not even be attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdError {
    #[error("Ad group ID is not configured for placement {0}")]
    NotConfigured(AdPlacement),
    #[error("Another ad is currently being shown")]
    AlreadyPlaying,
}

/// Shows ads by placement, one at a time, with playback paused meanwhile.
pub struct AdUseCase {
    client: AdServiceClient,
    pause: PauseCoordinator,
    interstitial_ad_group_id: String,
    rewarded_ad_group_id: String,
    pause_channels: PauseChannels,
    active: Mutex<Option<CancellationToken>>,
}

/// Clears the active slot when the flow ends, however it ends.
struct ActiveAd<'a> {
    slot: &'a Mutex<Option<CancellationToken>>,
}

impl Drop for ActiveAd<'_> {
    fn drop(&mut self) {
        *self.slot.lock() = None;
    }
}

impl AdUseCase {
    pub fn new(client: AdServiceClient, pause: PauseCoordinator, config: &MonetizationConfig) -> Self {
        Self {
            client,
            pause,
            interstitial_ad_group_id: config.interstitial_ad_group_id.clone(),
            rewarded_ad_group_id: config.rewarded_ad_group_id.clone(),
            pause_channels: config.ad_pause_channels(),
            active: Mutex::new(None),
        }
    }

    pub fn ad_group_id(&self, placement: AdPlacement) -> &str {
        match placement {
            AdPlacement::Interstitial => &self.interstitial_ad_group_id,
            AdPlacement::Rewarded => &self.rewarded_ad_group_id,
        }
    }

    pub fn is_ad_playing(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Cancel the ad in progress, if any. Its flow resolves as cancelled.
    pub fn cancel_active(&self) -> bool {
        match self.active.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn show_interstitial(&self, cancel: &CancellationToken) -> Result<AdResult, AdError> {
        self.show(AdPlacement::Interstitial, cancel).await
    }

    pub async fn show_rewarded(&self, cancel: &CancellationToken) -> Result<AdResult, AdError> {
        self.show(AdPlacement::Rewarded, cancel).await
    }

    /// Show one ad for `placement`.
    ///
    /// Failures after the ad was attempted are reported in the result's
    /// status, not as errors.
    pub async fn show(
        &self,
        placement: AdPlacement,
        cancel: &CancellationToken,
    ) -> Result<AdResult, AdError> {
        let ad_group_id = self.ad_group_id(placement).to_string();
        if ad_group_id.trim().is_empty() {
            return Err(AdError::NotConfigured(placement));
        }

        let token = {
            let mut active = self.active.lock();
            if active.is_some() {
                return Err(AdError::AlreadyPlaying);
            }
            let token = cancel.child_token();
            *active = Some(token.clone());
            token
        };
        let _active = ActiveAd { slot: &self.active };

        info!(%placement, ad_group_id = %ad_group_id, "Ad started");
        let _pause = self.pause.acquire(self.pause_channels, format!("Ad:{placement}"));

        let (status, reward_earned) = self.run(&ad_group_id, &token).await;
        let result = AdResult {
            placement,
            ad_group_id,
            status,
            reward_earned,
        };
        info!(
            %placement,
            status = ?result.status,
            reward_earned = result.reward_earned,
            "Ad finished"
        );
        Ok(result)
    }

    async fn run(&self, ad_group_id: &str, token: &CancellationToken) -> (AdStatus, bool) {
        let mut reward_earned = false;
        let mut events = self
            .client
            .show_ad_events(AdRequest::new(ad_group_id), token.clone());

        while let Some(event) = events.next().await {
            match event.map(|e| e.kind) {
                Ok(Some(ShowAdEventKind::UserEarnedReward(_))) => reward_earned = true,
                Ok(Some(ShowAdEventKind::Dismissed)) => return (AdStatus::Completed, reward_earned),
                // A reward earned before the failure is forfeited.
                Ok(Some(ShowAdEventKind::FailedToShow)) => return (AdStatus::FailedToShow, false),
                Ok(_) => {}
                Err(OperationError::NotStarted) => {
                    warn!(ad_group_id, "Ad could not be started on this host");
                    return (AdStatus::FailedToShow, false);
                }
                Err(e) => {
                    error!(ad_group_id, error = %e, "Failed to show ad");
                    return (AdStatus::FailedToShow, false);
                }
            }
        }

        // The stream ends silently on cancellation or on a flow that
        // finished without a terminal event.
        if token.is_cancelled() {
            (AdStatus::Cancelled, reward_earned)
        } else {
            (AdStatus::Completed, reward_earned)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_requires_completion() {
        let mut result = AdResult {
            placement: AdPlacement::Rewarded,
            ad_group_id: "rewarded.default".into(),
            status: AdStatus::Cancelled,
            reward_earned: true,
        };
        assert!(!result.is_reward_granted());
        result.status = AdStatus::Completed;
        assert!(result.is_reward_granted());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            AdError::AlreadyPlaying.to_string(),
            "Another ad is currently being shown"
        );
        assert_eq!(
            AdError::NotConfigured(AdPlacement::Rewarded).to_string(),
            "Ad group ID is not configured for placement Rewarded"
        );
    }
}
