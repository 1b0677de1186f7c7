//! Host-side operation table.

use crate::error::ContentionError;
use parking_lot::Mutex;
use shared_types::OperationId;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct Operation<E> {
    events: VecDeque<E>,
    finished: bool,
    created_at: Instant,
    last_activity: Instant,
    exclusive_key: Option<String>,
}

impl<E> Operation<E> {
    fn new(exclusive_key: Option<String>) -> Self {
        let now = Instant::now();
        Self {
            events: VecDeque::new(),
            finished: false,
            created_at: now,
            last_activity: now,
            exclusive_key,
        }
    }
}

/// Result of one poll.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome<E> {
    pub events: Vec<E>,
    pub is_finished: bool,
}

/// Statistics for an operation registry
#[derive(Debug, Default)]
pub struct OperationStats {
    /// Operations started
    pub started: AtomicU64,
    /// Operations whose terminal poll was collected
    pub collected: AtomicU64,
    /// Polls served, including unknown ids
    pub polls: AtomicU64,
    /// Polls for ids that did not exist
    pub unknown_polls: AtomicU64,
    /// Operations evicted by the TTL sweep
    pub evicted: AtomicU64,
    /// Exclusive starts refused
    pub rejected: AtomicU64,
}

/// Table of live operations for one feature, keyed by operation id.
///
/// Producers hold an [`EventSink`]; the Poll handler calls [`poll`].
/// Every method takes the table lock once, so a poll never observes half
/// of a push.
///
/// [`poll`]: OperationRegistry::poll
pub struct OperationRegistry<E> {
    operations: Mutex<HashMap<OperationId, Operation<E>>>,
    ttl: Duration,
    stats: OperationStats,
}

impl<E: Send + 'static> OperationRegistry<E> {
    pub fn new(ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            operations: Mutex::new(HashMap::new()),
            ttl,
            stats: OperationStats::default(),
        })
    }

    /// Create an entry with an empty queue and return its producer handle.
    pub fn start(self: &Arc<Self>) -> (OperationId, EventSink<E>) {
        let id = OperationId::generate();
        self.operations
            .lock()
            .insert(id.clone(), Operation::new(None));
        self.stats.started.fetch_add(1, Ordering::Relaxed);
        debug!(operation_id = %id, "Operation started");
        (id.clone(), self.sink(id))
    }

    /// Like [`start`](Self::start), but refused while another unfinished
    /// operation holds `key`.
    pub fn start_exclusive(
        self: &Arc<Self>,
        key: &str,
    ) -> Result<(OperationId, EventSink<E>), ContentionError> {
        let id = OperationId::generate();
        {
            let mut operations = self.operations.lock();
            let busy = operations
                .values()
                .any(|op| !op.finished && op.exclusive_key.as_deref() == Some(key));
            if busy {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Exclusive operation already running");
                return Err(ContentionError {
                    key: key.to_string(),
                });
            }
            operations.insert(id.clone(), Operation::new(Some(key.to_string())));
        }
        self.stats.started.fetch_add(1, Ordering::Relaxed);
        debug!(operation_id = %id, key, "Exclusive operation started");
        Ok((id.clone(), self.sink(id)))
    }

    fn sink(self: &Arc<Self>, id: OperationId) -> EventSink<E> {
        EventSink {
            id,
            registry: Arc::downgrade(self),
        }
    }

    /// Append an event. Ignored once the operation finished or is gone.
    pub fn push(&self, id: &OperationId, event: E) -> bool {
        let mut operations = self.operations.lock();
        match operations.get_mut(id) {
            Some(op) if !op.finished => {
                op.events.push_back(event);
                op.last_activity = Instant::now();
                true
            }
            Some(_) => {
                debug!(operation_id = %id, "Event after finish ignored");
                false
            }
            None => false,
        }
    }

    /// Append a terminal event and mark the operation finished, atomically.
    pub fn push_terminal(&self, id: &OperationId, event: E) -> bool {
        let mut operations = self.operations.lock();
        match operations.get_mut(id) {
            Some(op) if !op.finished => {
                op.events.push_back(event);
                op.finished = true;
                op.last_activity = Instant::now();
                true
            }
            _ => false,
        }
    }

    /// Mark finished. Returns false if already finished or unknown.
    pub fn finish(&self, id: &OperationId) -> bool {
        let mut operations = self.operations.lock();
        match operations.get_mut(id) {
            Some(op) if !op.finished => {
                op.finished = true;
                op.last_activity = Instant::now();
                true
            }
            _ => false,
        }
    }

    /// Drain queued events. A finished entry is deleted by the poll that
    /// observes it; unknown ids report `{[], true}`.
    pub fn poll(&self, id: &OperationId) -> PollOutcome<E> {
        self.stats.polls.fetch_add(1, Ordering::Relaxed);
        let mut operations = self.operations.lock();

        let Some(op) = operations.get_mut(id) else {
            self.stats.unknown_polls.fetch_add(1, Ordering::Relaxed);
            debug!(operation_id = %id, "Poll for unknown operation");
            return PollOutcome {
                events: Vec::new(),
                is_finished: true,
            };
        };

        let events: Vec<E> = op.events.drain(..).collect();
        let is_finished = op.finished;
        op.last_activity = Instant::now();

        if is_finished {
            operations.remove(id);
            self.stats.collected.fetch_add(1, Ordering::Relaxed);
            debug!(operation_id = %id, "Operation collected");
        }

        PollOutcome {
            events,
            is_finished,
        }
    }

    /// Drop an entry whose flow never began.
    pub fn discard(&self, id: &OperationId) -> bool {
        self.operations.lock().remove(id).is_some()
    }

    /// Evict operations idle for longer than the TTL.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.operations.lock().retain(|id, op| {
            let idle = now.duration_since(op.last_activity);
            if idle > self.ttl {
                warn!(
                    operation_id = %id,
                    age_ms = now.duration_since(op.created_at).as_millis(),
                    idle_ms = idle.as_millis(),
                    finished = op.finished,
                    pending_events = op.events.len(),
                    "Evicting abandoned operation"
                );
                removed += 1;
                false
            } else {
                true
            }
        });

        self.stats.evicted.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn contains(&self, id: &OperationId) -> bool {
        self.operations.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.operations.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.lock().is_empty()
    }

    pub fn stats(&self) -> &OperationStats {
        &self.stats
    }
}

/// Producer handle for one operation.
///
/// Feature callbacks hold this instead of the registry. It does not keep
/// the registry alive; once the registry is gone every call returns false.
pub struct EventSink<E> {
    id: OperationId,
    registry: Weak<OperationRegistry<E>>,
}

impl<E> Clone for EventSink<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<E> std::fmt::Debug for EventSink<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink").field("id", &self.id).finish_non_exhaustive()
    }
}

impl<E: Send + 'static> EventSink<E> {
    pub fn id(&self) -> &OperationId {
        &self.id
    }

    pub fn emit(&self, event: E) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.push(&self.id, event))
    }

    /// Emit the last event of the flow and finish it.
    pub fn emit_terminal(&self, event: E) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.push_terminal(&self.id, event))
    }

    pub fn finish(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.finish(&self.id))
    }
}

/// Background task evicting idle operations until `shutdown` fires.
pub async fn sweep_task<E: Send + 'static>(
    registry: Arc<OperationRegistry<E>>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let removed = registry.remove_expired();
                if removed > 0 {
                    info!(removed, remaining = registry.len(), "Swept abandoned operations");
                }
            }
        }
    }
}
