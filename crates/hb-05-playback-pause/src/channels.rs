//! Pause channel sets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Set of playback channels a pause request covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PauseChannels(u8);

impl PauseChannels {
    pub const NONE: Self = Self(0);
    /// Simulation time scale
    pub const TIME: Self = Self(1);
    /// Audio listener
    pub const AUDIO: Self = Self(1 << 1);
    pub const ALL: Self = Self(Self::TIME.0 | Self::AUDIO.0);

    /// Build from the two per-feature switches found in configuration.
    pub fn from_flags(time: bool, audio: bool) -> Self {
        let mut channels = Self::NONE;
        if time {
            channels = channels | Self::TIME;
        }
        if audio {
            channels = channels | Self::AUDIO;
        }
        channels
    }

    pub fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for PauseChannels {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for PauseChannels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.contains(Self::TIME), self.contains(Self::AUDIO)) {
            (true, true) => write!(f, "time+audio"),
            (true, false) => write!(f, "time"),
            (false, true) => write!(f, "audio"),
            (false, false) => write!(f, "none"),
        }
    }
}
