//! Outbound calls awaiting an answer from the other side of the bridge.

use crate::error::RpcError;
use bytes::Bytes;
use dashmap::DashMap;
use shared_types::CorrelationId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// What a caller's receiver resolves with.
#[derive(Debug)]
pub struct PendingResponse {
    pub correlation_id: CorrelationId,
    /// Response payload bytes, or the error the peer answered with
    pub result: Result<Bytes, RpcError>,
    /// Round trip across the bridge
    pub response_time: Duration,
}

struct PendingRequest {
    sender: oneshot::Sender<PendingResponse>,
    created_at: Instant,
    /// Method selector, kept for log lines only
    method: String,
    /// `None` waits forever.
    timeout: Option<Duration>,
}

/// Counters over the lifetime of one multiplexer's outbound calls.
#[derive(Debug, Default)]
pub struct PendingStats {
    pub total_registered: AtomicU64,
    /// Answered while the caller was still waiting
    pub total_completed: AtomicU64,
    /// Swept by the cleanup task or given up at the caller's deadline
    pub total_timeouts: AtomicU64,
    /// Caller cancelled, or dropped its receiver before the answer arrived
    pub total_cancelled: AtomicU64,
}

/// Outbound calls waiting for their response envelope.
///
/// The transport only carries one-way messages, so every call parks a
/// oneshot sender here under its token:
///
/// ```text
/// call() ── register() ──► token ──► request envelope ──► peer
///   ▲                                                      │
///   └──── oneshot ◄── complete(token) ◄── response envelope┘
/// ```
///
/// Entries leave through `complete`, `cancel`, `expire`, or the sweep.
pub struct PendingRequestStore {
    pending: DashMap<CorrelationId, PendingRequest>,
    default_timeout: Option<Duration>,
    stats: Arc<PendingStats>,
}

impl PendingRequestStore {
    pub fn new(default_timeout: Option<Duration>) -> Self {
        Self {
            pending: DashMap::new(),
            default_timeout,
            stats: Arc::new(PendingStats::default()),
        }
    }

    /// Park a call under a fresh token. The receiver resolves once the
    /// matching response envelope arrives.
    pub fn register(
        &self,
        method: &str,
        timeout: Option<Duration>,
    ) -> (CorrelationId, oneshot::Receiver<PendingResponse>) {
        let correlation_id = CorrelationId::new();
        let (tx, rx) = oneshot::channel();

        let request = PendingRequest {
            sender: tx,
            created_at: Instant::now(),
            method: method.to_string(),
            timeout: timeout.or(self.default_timeout),
        };

        self.pending.insert(correlation_id, request);
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        debug!(
            correlation_id = %correlation_id,
            method = method,
            "Call parked"
        );

        (correlation_id, rx)
    }

    /// Hand a response envelope's result to the caller waiting on its token.
    ///
    /// False for late, duplicate, or unknown tokens, and for callers that
    /// already stopped listening.
    pub fn complete(&self, correlation_id: CorrelationId, result: Result<Bytes, RpcError>) -> bool {
        let Some((_, pending)) = self.pending.remove(&correlation_id) else {
            warn!(
                correlation_id = %correlation_id,
                "Response arrived for a call nobody is waiting on"
            );
            return false;
        };

        let response_time = pending.created_at.elapsed();
        let response = PendingResponse {
            correlation_id,
            result,
            response_time,
        };

        match pending.sender.send(response) {
            Ok(()) => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    method = pending.method,
                    response_time_ms = response_time.as_millis(),
                    "Call answered"
                );
                true
            }
            Err(_) => {
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    method = pending.method,
                    "Caller stopped listening before the answer arrived"
                );
                false
            }
        }
    }

    /// Drop calls past their timeout; their callers observe a closed
    /// channel and report `TIMEOUT`.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.pending.retain(|id, request| {
            let Some(timeout) = request.timeout else {
                return true;
            };
            let elapsed = now.duration_since(request.created_at);
            if elapsed > timeout {
                warn!(
                    correlation_id = %id,
                    method = request.method,
                    elapsed_ms = elapsed.as_millis(),
                    timeout_ms = timeout.as_millis(),
                    "No answer in time, dropping call"
                );
                self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
                removed += 1;
                false
            } else {
                true
            }
        });

        removed
    }

    /// Forget a call whose caller hit its deadline.
    pub fn expire(&self, correlation_id: &CorrelationId) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Forget a call whose caller gave up.
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

/// Sweeps unanswered calls every `interval` until `shutdown` fires.
pub async fn cleanup_task(
    store: Arc<PendingRequestStore>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let removed = store.remove_expired();
                if removed > 0 {
                    debug!(removed, "Swept unanswered calls");
                }
            }
        }
    }
}
