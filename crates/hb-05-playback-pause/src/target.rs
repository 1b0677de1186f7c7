//! Port to the engine's playback toggles.

use parking_lot::Mutex;

/// The two shared toggles the coordinator guards.
///
/// Implemented by the engine's clock and audio listener. Calls arrive with
/// the coordinator's lock held, so implementations must not call back into
/// the coordinator.
pub trait PlaybackTarget: Send + Sync {
    fn time_scale(&self) -> f32;
    fn set_time_scale(&self, scale: f32);
    fn audio_paused(&self) -> bool;
    fn set_audio_paused(&self, paused: bool);
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Toggles {
    time_scale: f32,
    audio_paused: bool,
}

/// Plain in-memory toggles, used headless and in tests.
#[derive(Debug)]
pub struct InMemoryPlayback {
    toggles: Mutex<Toggles>,
}

impl InMemoryPlayback {
    pub fn new(time_scale: f32, audio_paused: bool) -> Self {
        Self {
            toggles: Mutex::new(Toggles {
                time_scale,
                audio_paused,
            }),
        }
    }
}

impl Default for InMemoryPlayback {
    fn default() -> Self {
        Self::new(1.0, false)
    }
}

impl PlaybackTarget for InMemoryPlayback {
    fn time_scale(&self) -> f32 {
        self.toggles.lock().time_scale
    }

    fn set_time_scale(&self, scale: f32) {
        self.toggles.lock().time_scale = scale;
    }

    fn audio_paused(&self) -> bool {
        self.toggles.lock().audio_paused
    }

    fn set_audio_paused(&self, paused: bool) {
        self.toggles.lock().audio_paused = paused;
    }
}
