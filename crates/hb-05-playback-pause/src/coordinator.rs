//! Reference-counted pause coordinator.

use crate::channels::PauseChannels;
use crate::target::PlaybackTarget;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

const PAUSED_TIME_SCALE: f32 = 0.0;
const PAUSED_AUDIO: bool = true;

/// Count plus the value to restore. `prior` is only meaningful while
/// `count > 0`.
#[derive(Debug, Default)]
struct ChannelState<T> {
    count: u32,
    prior: Option<T>,
}

impl<T: Copy> ChannelState<T> {
    /// Returns true when this is the first holder.
    fn acquire(&mut self, current: impl FnOnce() -> T) -> bool {
        let first = self.count == 0;
        if first {
            self.prior = Some(current());
        }
        self.count += 1;
        first
    }

    /// Returns the value to restore when the last holder left.
    fn release(&mut self) -> Option<T> {
        self.count = self.count.saturating_sub(1);
        if self.count == 0 {
            self.prior.take()
        } else {
            None
        }
    }
}

struct ActiveRequest {
    channels: PauseChannels,
    reason: String,
}

#[derive(Default)]
struct PauseState {
    time: ChannelState<f32>,
    audio: ChannelState<bool>,
    active: HashMap<u64, ActiveRequest>,
    next_id: u64,
}

struct Inner {
    state: Mutex<PauseState>,
    target: Arc<dyn PlaybackTarget>,
}

impl Inner {
    fn release(&self, id: u64) {
        let mut state = self.state.lock();
        let Some(request) = state.active.remove(&id) else {
            warn!(request_id = id, "Release for unknown pause request");
            return;
        };

        if request.channels.contains(PauseChannels::TIME) {
            if let Some(prior) = state.time.release() {
                self.target.set_time_scale(prior);
                debug!(time_scale = prior, "Time resumed");
            }
        }
        if request.channels.contains(PauseChannels::AUDIO) {
            if let Some(prior) = state.audio.release() {
                self.target.set_audio_paused(prior);
                debug!(audio_paused = prior, "Audio resumed");
            }
        }

        debug!(
            request_id = id,
            reason = %request.reason,
            time_refs = state.time.count,
            audio_refs = state.audio.count,
            "Pause released"
        );
    }
}

/// Shared guard over the time and audio toggles.
///
/// Cheap to clone; clones share state. Build one per engine context and
/// hand it to every feature that pauses playback.
#[derive(Clone)]
pub struct PauseCoordinator {
    inner: Arc<Inner>,
}

impl PauseCoordinator {
    pub fn new(target: Arc<dyn PlaybackTarget>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(PauseState::default()),
                target,
            }),
        }
    }

    /// Pause `channels` until the returned handle is disposed or dropped.
    ///
    /// An empty set returns `None` and touches nothing.
    pub fn acquire(&self, channels: PauseChannels, reason: impl Into<String>) -> Option<PauseHandle> {
        if channels.is_empty() {
            return None;
        }
        let reason = reason.into();
        let target = &self.inner.target;

        let mut state = self.inner.state.lock();
        if channels.contains(PauseChannels::TIME)
            && state.time.acquire(|| target.time_scale())
        {
            target.set_time_scale(PAUSED_TIME_SCALE);
            debug!("Time paused");
        }
        if channels.contains(PauseChannels::AUDIO)
            && state.audio.acquire(|| target.audio_paused())
        {
            target.set_audio_paused(PAUSED_AUDIO);
            debug!("Audio paused");
        }

        let id = state.next_id;
        state.next_id += 1;
        state.active.insert(
            id,
            ActiveRequest {
                channels,
                reason: reason.clone(),
            },
        );
        debug!(
            request_id = id,
            reason = %reason,
            %channels,
            time_refs = state.time.count,
            audio_refs = state.audio.count,
            "Pause acquired"
        );
        drop(state);

        Some(PauseHandle {
            id,
            channels,
            reason,
            disposed: AtomicBool::new(false),
            inner: self.inner.clone(),
        })
    }

    /// Number of live handles holding `channel`.
    pub fn reference_count(&self, channel: PauseChannels) -> u32 {
        let state = self.inner.state.lock();
        if channel == PauseChannels::TIME {
            state.time.count
        } else if channel == PauseChannels::AUDIO {
            state.audio.count
        } else {
            0
        }
    }

    /// True while every channel in `channels` is held.
    pub fn is_paused(&self, channels: PauseChannels) -> bool {
        let state = self.inner.state.lock();
        (!channels.contains(PauseChannels::TIME) || state.time.count > 0)
            && (!channels.contains(PauseChannels::AUDIO) || state.audio.count > 0)
            && !channels.is_empty()
    }

    /// Reasons of live handles, oldest first.
    pub fn active_reasons(&self) -> Vec<String> {
        let state = self.inner.state.lock();
        let mut active: Vec<_> = state
            .active
            .iter()
            .map(|(id, request)| (*id, request.reason.clone()))
            .collect();
        active.sort_by_key(|(id, _)| *id);
        active.into_iter().map(|(_, reason)| reason).collect()
    }
}

impl fmt::Debug for PauseCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("PauseCoordinator")
            .field("time_refs", &state.time.count)
            .field("audio_refs", &state.audio.count)
            .field("active", &state.active.len())
            .finish()
    }
}

/// One pause request. Disposing (or dropping) it releases its channels once.
pub struct PauseHandle {
    id: u64,
    channels: PauseChannels,
    reason: String,
    disposed: AtomicBool,
    inner: Arc<Inner>,
}

impl PauseHandle {
    pub fn channels(&self) -> PauseChannels {
        self.channels
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Release the channels. Later calls are no-ops.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.release(self.id);
    }
}

impl Drop for PauseHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for PauseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PauseHandle")
            .field("id", &self.id)
            .field("channels", &self.channels)
            .field("reason", &self.reason)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
