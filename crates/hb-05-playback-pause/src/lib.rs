//! # HB-05 Playback Pause
//!
//! Several features want playback paused at the same time: an ad wants time
//! and audio stopped while it plays, the host going to the background wants
//! the same. Writing the toggles directly makes the first feature to finish
//! resume playback under the other one.
//!
//! The coordinator reference-counts each channel instead:
//!
//! ```text
//!   value=1.0
//!   acquire(TIME, "ad")          count 0→1  snapshot 1.0, force 0.0
//!   acquire(TIME, "hidden")      count 1→2  (already paused)
//!   handle("ad").dispose()       count 2→1  still 0.0
//!   handle("hidden").dispose()   count 1→0  restore 1.0
//! ```
//!
//! Handles release on drop, and releasing twice does nothing.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![deny(unsafe_code)]

pub mod channels;
pub mod coordinator;
pub mod target;
pub mod visibility;

pub use channels::PauseChannels;
pub use coordinator::{PauseCoordinator, PauseHandle};
pub use target::{InMemoryPlayback, PlaybackTarget};
pub use visibility::{HostVisibility, UnknownVisibility, VisibilityPauseController};
