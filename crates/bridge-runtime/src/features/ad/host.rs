//! Host side of the ad feature: the AdService and its provider port.

use super::messages::{
    AdLoaded, AdRequest, AdReward, LoadAdEvent, LoadAdEventKind, ShowAdEvent, ShowAdEventKind,
};
use super::{AD_SERVICE, LOAD_AD, POLL_LOAD_AD_EVENTS, POLL_SHOW_AD_EVENTS, SHOW_AD, SHOW_AD_EXCLUSIVE_KEY};
use async_trait::async_trait;
use hb_03_rpc_multiplexer::ServiceDescriptor;
use hb_04_operation_registry::{
    EventSink, LongRunningMethods, OperationRegistry, OperationServiceExt, StartError,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Events whose arrival ends their flow.
pub trait TerminalEvent {
    fn is_terminal(&self) -> bool;

    /// The terminal event reported when the SDK fails mid-flow.
    fn failure() -> Self;
}

impl TerminalEvent for LoadAdEvent {
    fn is_terminal(&self) -> bool {
        LoadAdEvent::is_terminal(self)
    }

    fn failure() -> Self {
        LoadAdEvent::new(LoadAdEventKind::FailedToShow)
    }
}

impl TerminalEvent for ShowAdEvent {
    fn is_terminal(&self) -> bool {
        ShowAdEvent::is_terminal(self)
    }

    fn failure() -> Self {
        ShowAdEvent::new(ShowAdEventKind::FailedToShow)
    }
}

/// Callbacks handed to the ad SDK for one operation.
pub struct AdCallbacks<E> {
    sink: EventSink<E>,
}

impl<E> Clone for AdCallbacks<E> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
        }
    }
}

impl<E: TerminalEvent + Send + 'static> AdCallbacks<E> {
    pub fn new(sink: EventSink<E>) -> Self {
        Self { sink }
    }

    pub fn on_event(&self, event: E) {
        if event.is_terminal() {
            self.sink.emit_terminal(event);
        } else {
            self.sink.emit(event);
        }
    }

    /// SDK-level failure: the flow ends with a failed-to-show event.
    pub fn on_error(&self, message: &str) {
        warn!(operation_id = %self.sink.id(), error = message, "Ad operation failed");
        self.sink.emit_terminal(E::failure());
    }
}

/// The host's ad SDK.
///
/// `load_ad`/`show_ad` return once the SDK accepted the request; events
/// arrive later through the callbacks.
#[async_trait]
pub trait AdProvider: Send + Sync {
    async fn load_ad(
        &self,
        ad_group_id: &str,
        callbacks: AdCallbacks<LoadAdEvent>,
    ) -> Result<(), StartError>;

    async fn show_ad(
        &self,
        ad_group_id: &str,
        callbacks: AdCallbacks<ShowAdEvent>,
    ) -> Result<(), StartError>;
}

/// Operation tables of the AdService.
pub struct AdRegistries {
    pub load: Arc<OperationRegistry<LoadAdEvent>>,
    pub show: Arc<OperationRegistry<ShowAdEvent>>,
}

impl AdRegistries {
    pub fn new(ttl: Duration) -> Self {
        Self {
            load: OperationRegistry::new(ttl),
            show: OperationRegistry::new(ttl),
        }
    }
}

fn require_group(request: &AdRequest) -> Result<(), StartError> {
    if request.ad_group_id.trim().is_empty() {
        Err(StartError::Rejected("ad_group_id is required".into()))
    } else {
        Ok(())
    }
}

/// Build the AdService descriptor over `provider`.
pub fn ad_service(registries: &AdRegistries, provider: Arc<dyn AdProvider>) -> ServiceDescriptor {
    let load_provider = provider.clone();
    let show_provider = provider;

    ServiceDescriptor::new(AD_SERVICE)
        .long_running(
            LongRunningMethods::new(LOAD_AD, POLL_LOAD_AD_EVENTS),
            registries.load.clone(),
            move |request: AdRequest, sink: EventSink<LoadAdEvent>| {
                let provider = load_provider.clone();
                async move {
                    require_group(&request)?;
                    debug!(operation_id = %sink.id(), ad_group_id = %request.ad_group_id, "Loading ad");
                    provider
                        .load_ad(&request.ad_group_id, AdCallbacks::new(sink))
                        .await
                }
            },
        )
        .long_running(
            LongRunningMethods::new(SHOW_AD, POLL_SHOW_AD_EVENTS).exclusive(SHOW_AD_EXCLUSIVE_KEY),
            registries.show.clone(),
            move |request: AdRequest, sink: EventSink<ShowAdEvent>| {
                let provider = show_provider.clone();
                async move {
                    require_group(&request)?;
                    debug!(operation_id = %sink.id(), ad_group_id = %request.ad_group_id, "Showing ad");
                    provider
                        .show_ad(&request.ad_group_id, AdCallbacks::new(sink))
                        .await
                }
            },
        )
}

/// What a scripted ad does after it was shown.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Event(ShowAdEventKind),
    Error(String),
}

/// In-process ad SDK that replays fixed event scripts with a delay between
/// steps. Used by the demo binary and tests.
pub struct ScriptedAdProvider {
    supported: bool,
    step_delay: Duration,
    show_scripts: RwLock<HashMap<String, Vec<ScriptStep>>>,
}

impl ScriptedAdProvider {
    pub fn new(step_delay: Duration) -> Self {
        Self {
            supported: true,
            step_delay,
            show_scripts: RwLock::new(HashMap::new()),
        }
    }

    /// A provider on a host without ad support.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new(Duration::ZERO)
        }
    }

    /// Steps played for `ad_group_id`, replacing the default script.
    pub fn with_show_script(self, ad_group_id: impl Into<String>, steps: Vec<ScriptStep>) -> Self {
        self.show_scripts.write().insert(ad_group_id.into(), steps);
        self
    }

    /// requested, show, impression, dismissed
    pub fn interstitial_script() -> Vec<ScriptStep> {
        vec![
            ScriptStep::Event(ShowAdEventKind::Requested),
            ScriptStep::Event(ShowAdEventKind::Show),
            ScriptStep::Event(ShowAdEventKind::Impression),
            ScriptStep::Event(ShowAdEventKind::Dismissed),
        ]
    }

    /// The interstitial script with a reward before dismissal.
    pub fn rewarded_script(unit_type: &str, unit_amount: i32) -> Vec<ScriptStep> {
        vec![
            ScriptStep::Event(ShowAdEventKind::Requested),
            ScriptStep::Event(ShowAdEventKind::Show),
            ScriptStep::Event(ShowAdEventKind::Impression),
            ScriptStep::Event(ShowAdEventKind::UserEarnedReward(AdReward {
                unit_type: unit_type.to_string(),
                unit_amount,
            })),
            ScriptStep::Event(ShowAdEventKind::Dismissed),
        ]
    }

    fn check_supported(&self) -> Result<(), StartError> {
        if self.supported {
            Ok(())
        } else {
            Err(StartError::Unsupported("ads are not supported on this host".into()))
        }
    }
}

#[async_trait]
impl AdProvider for ScriptedAdProvider {
    async fn load_ad(
        &self,
        ad_group_id: &str,
        callbacks: AdCallbacks<LoadAdEvent>,
    ) -> Result<(), StartError> {
        self.check_supported()?;
        let delay = self.step_delay;
        let loaded = AdLoaded {
            response_id: format!("scripted-{ad_group_id}"),
            ad_network_class_name: "ScriptedAdNetwork".to_string(),
        };
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callbacks.on_event(LoadAdEvent::new(LoadAdEventKind::Loaded(loaded)));
            // Loading never dismisses; the flow ends once the ad is ready.
            callbacks.sink.finish();
        });
        Ok(())
    }

    async fn show_ad(
        &self,
        ad_group_id: &str,
        callbacks: AdCallbacks<ShowAdEvent>,
    ) -> Result<(), StartError> {
        self.check_supported()?;
        let steps = self
            .show_scripts
            .read()
            .get(ad_group_id)
            .cloned()
            .unwrap_or_else(Self::interstitial_script);
        let delay = self.step_delay;

        tokio::spawn(async move {
            for step in steps {
                tokio::time::sleep(delay).await;
                match step {
                    ScriptStep::Event(kind) => callbacks.on_event(ShowAdEvent::new(kind)),
                    ScriptStep::Error(message) => {
                        callbacks.on_error(&message);
                        return;
                    }
                }
            }
        });
        Ok(())
    }
}
