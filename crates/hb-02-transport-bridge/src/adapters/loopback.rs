//! In-process loopback between an engine bridge and a host bridge.
//!
//! Stands in for the browser page in tests and in the demo runtime. Both
//! directions deliver synchronously, so send order is arrival order.
//! Disconnecting the link makes every send vanish silently, the same way a
//! message dropped by the real page would.

use crate::engine::EngineBridge;
use crate::host::HostBridge;
use crate::ports::{EngineInvoke, HostDispatch};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

#[derive(Debug)]
struct LinkState {
    connected: AtomicBool,
    lost: AtomicU64,
}

impl LinkState {
    fn deliverable(&self) -> bool {
        if self.connected.load(Ordering::Acquire) {
            true
        } else {
            self.lost.fetch_add(1, Ordering::Relaxed);
            false
        }
    }
}

/// Handle controlling a loopback connection.
#[derive(Debug, Clone)]
pub struct LoopbackLink {
    state: Arc<LinkState>,
}

impl LoopbackLink {
    /// Let messages through again.
    pub fn reconnect(&self) {
        self.state.connected.store(true, Ordering::Release);
        debug!("Loopback link reconnected");
    }

    /// Silently drop every message until reconnected.
    pub fn sever(&self) {
        self.state.connected.store(false, Ordering::Release);
        debug!("Loopback link severed");
    }

    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }

    /// Messages swallowed while severed.
    pub fn lost(&self) -> u64 {
        self.state.lost.load(Ordering::Relaxed)
    }
}

struct EngineToHost {
    host: Weak<HostBridge>,
    state: Arc<LinkState>,
}

impl HostDispatch for EngineToHost {
    fn dispatch_event(&self, event_name: &str, payload: &str) {
        if !self.state.deliverable() {
            return;
        }
        if let Some(host) = self.host.upgrade() {
            host.handle_engine_event(event_name, payload);
        }
    }
}

struct HostToEngine {
    engine: Weak<EngineBridge>,
    state: Arc<LinkState>,
}

impl EngineInvoke for HostToEngine {
    fn send_message(&self, object_name: &str, method_name: &str, argument: &str) {
        if !self.state.deliverable() {
            return;
        }
        let Some(engine) = self.engine.upgrade() else {
            return;
        };
        if object_name != engine.config().entrypoint_object {
            warn!(object = object_name, "No engine object with that name");
            return;
        }
        engine.invoke(method_name, argument);
    }
}

/// Wire `engine` and `host` to each other.
///
/// The bridges hold only weak references to each other through the link,
/// so dropping either side does not keep the other alive.
pub fn connect_loopback(engine: &Arc<EngineBridge>, host: &Arc<HostBridge>) -> LoopbackLink {
    let state = Arc::new(LinkState {
        connected: AtomicBool::new(true),
        lost: AtomicU64::new(0),
    });

    engine.connect_host(Arc::new(EngineToHost {
        host: Arc::downgrade(host),
        state: state.clone(),
    }));
    host.connect_engine(Arc::new(HostToEngine {
        engine: Arc::downgrade(engine),
        state: state.clone(),
    }));

    LoopbackLink { state }
}
