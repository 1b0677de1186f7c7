//! Pausing while the host page is hidden.

use crate::channels::PauseChannels;
use crate::coordinator::{PauseCoordinator, PauseHandle};
use parking_lot::Mutex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

/// Visibility state reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostVisibility {
    Visible,
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown visibility state: {0:?}")]
pub struct UnknownVisibility(pub String);

impl FromStr for HostVisibility {
    type Err = UnknownVisibility;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "visible" => Ok(Self::Visible),
            "hidden" => Ok(Self::Hidden),
            other => Err(UnknownVisibility(other.to_string())),
        }
    }
}

impl fmt::Display for HostVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visible => write!(f, "visible"),
            Self::Hidden => write!(f, "hidden"),
        }
    }
}

/// Holds at most one pause while the host is hidden.
pub struct VisibilityPauseController {
    coordinator: PauseCoordinator,
    channels: PauseChannels,
    handle: Mutex<Option<PauseHandle>>,
}

impl VisibilityPauseController {
    pub const REASON: &'static str = "host-hidden";

    pub fn new(coordinator: PauseCoordinator, channels: PauseChannels) -> Self {
        Self {
            coordinator,
            channels,
            handle: Mutex::new(None),
        }
    }

    pub fn apply(&self, visibility: HostVisibility) {
        let mut handle = self.handle.lock();
        match visibility {
            HostVisibility::Hidden => {
                if handle.is_some() {
                    debug!("Host already hidden");
                    return;
                }
                *handle = self.coordinator.acquire(self.channels, Self::REASON);
                info!(channels = %self.channels, "Host hidden, playback paused");
            }
            HostVisibility::Visible => {
                if let Some(pause) = handle.take() {
                    pause.dispose();
                    info!("Host visible, playback resumed");
                }
            }
        }
    }

    /// Apply a raw signal from the host. Unknown states change nothing.
    pub fn on_signal(&self, state: &str) -> Result<HostVisibility, UnknownVisibility> {
        let visibility = state.parse()?;
        self.apply(visibility);
        Ok(visibility)
    }

    pub fn is_holding(&self) -> bool {
        self.handle.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{InMemoryPlayback, PlaybackTarget};
    use std::sync::Arc;

    fn setup(channels: PauseChannels) -> (VisibilityPauseController, PauseCoordinator, Arc<InMemoryPlayback>) {
        let target = Arc::new(InMemoryPlayback::default());
        let coordinator = PauseCoordinator::new(target.clone());
        (
            VisibilityPauseController::new(coordinator.clone(), channels),
            coordinator,
            target,
        )
    }

    #[test]
    fn test_hidden_twice_then_visible_restores_once() {
        let (controller, coordinator, target) = setup(PauseChannels::ALL);
        controller.on_signal("hidden").unwrap();
        controller.on_signal("hidden").unwrap();
        assert_eq!(coordinator.reference_count(PauseChannels::TIME), 1);
        assert_eq!(target.time_scale(), 0.0);

        controller.on_signal("visible").unwrap();
        assert_eq!(coordinator.reference_count(PauseChannels::TIME), 0);
        assert_eq!(target.time_scale(), 1.0);
        assert!(!target.audio_paused());

        controller.on_signal("visible").unwrap();
        assert!(!controller.is_holding());
    }

    #[test]
    fn test_visibility_shares_pause_with_other_holders() {
        let (controller, coordinator, target) = setup(PauseChannels::ALL);
        let ad = coordinator.acquire(PauseChannels::ALL, "ad").unwrap();
        controller.apply(HostVisibility::Hidden);
        controller.apply(HostVisibility::Visible);
        assert_eq!(target.time_scale(), 0.0);
        drop(ad);
        assert_eq!(target.time_scale(), 1.0);
    }

    #[test]
    fn test_no_channels_configured() {
        let (controller, _coordinator, target) = setup(PauseChannels::NONE);
        controller.apply(HostVisibility::Hidden);
        assert!(!controller.is_holding());
        assert_eq!(target.time_scale(), 1.0);
    }

    #[test]
    fn test_unknown_signal_rejected() {
        let (controller, _coordinator, _target) = setup(PauseChannels::ALL);
        assert_eq!(
            controller.on_signal("prerender").unwrap_err(),
            UnknownVisibility("prerender".into())
        );
        assert!(!controller.is_holding());
    }
}
