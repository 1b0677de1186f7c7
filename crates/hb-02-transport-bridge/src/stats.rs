//! Per-side transport counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for one side of the bridge
#[derive(Debug, Default)]
pub struct TransportStats {
    /// Payloads handed to the platform primitive
    pub sent: AtomicU64,
    /// Payloads decoded and delivered to the receive callback
    pub received: AtomicU64,
    /// Inbound payloads dropped (bad base64, no callback installed)
    pub dropped: AtomicU64,
    /// Inbound events ignored because they carried another event name
    pub ignored: AtomicU64,
}

impl TransportStats {
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn ignored(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }
}
