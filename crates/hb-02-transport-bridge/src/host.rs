//! Host side of the bridge.

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::payload;
use crate::ports::{DuplexChannel, EngineInvoke, ReceiveCallback};
use crate::stats::TransportStats;
use crate::Side;
use parking_lot::RwLock;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Host-side endpoint.
///
/// Outbound payloads invoke the engine's entrypoint method. Inbound payloads
/// arrive through [`handle_engine_event`], which the host's dispatch
/// function forwards every engine event to.
///
/// [`handle_engine_event`]: HostBridge::handle_engine_event
pub struct HostBridge {
    config: TransportConfig,
    engine: RwLock<Option<Arc<dyn EngineInvoke>>>,
    receiver: RwLock<Option<ReceiveCallback>>,
    stats: TransportStats,
}

impl HostBridge {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            engine: RwLock::new(None),
            receiver: RwLock::new(None),
            stats: TransportStats::default(),
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Wire the engine instance's message entrypoint.
    pub fn connect_engine(&self, engine: Arc<dyn EngineInvoke>) {
        *self.engine.write() = Some(engine);
        debug!(object = %self.config.entrypoint_object, "Host bridge connected to engine");
    }

    pub fn disconnect_engine(&self) {
        *self.engine.write() = None;
    }

    fn engine(&self) -> Result<Arc<dyn EngineInvoke>, TransportError> {
        self.engine
            .read()
            .clone()
            .ok_or(TransportError::Unavailable(Side::Host))
    }

    /// Send an opaque payload to the engine.
    pub fn send_to_engine(&self, payload: &[u8]) -> Result<(), TransportError> {
        let engine = self.engine()?;
        let text = payload::encode(payload);
        engine.send_message(
            &self.config.entrypoint_object,
            &self.config.entrypoint_method,
            &text,
        );
        self.stats.sent.fetch_add(1, Ordering::Relaxed);
        trace!(bytes = payload.len(), "Sent payload to engine");
        Ok(())
    }

    /// Invoke another engine entrypoint with a plain string argument.
    pub fn invoke_engine(&self, method_name: &str, argument: &str) -> Result<(), TransportError> {
        let engine = self.engine()?;
        engine.send_message(&self.config.entrypoint_object, method_name, argument);
        Ok(())
    }

    /// Forward the host's visibility state ("hidden" / "visible") to the engine.
    pub fn notify_visibility(&self, state: &str) -> Result<(), TransportError> {
        self.invoke_engine(&self.config.visibility_method, state)
    }

    /// Entry point for every event the engine dispatches.
    ///
    /// Events under other names belong to other integrations and are ignored.
    pub fn handle_engine_event(&self, event_name: &str, base64_payload: &str) {
        if event_name != self.config.event_name {
            self.stats.ignored.fetch_add(1, Ordering::Relaxed);
            trace!(event_name, "Ignoring non-RPC engine event");
            return;
        }

        let bytes = match payload::decode(base64_payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Dropping undecodable payload from engine");
                return;
            }
        };

        let receiver = self.receiver.read().clone();
        match receiver {
            Some(callback) => {
                self.stats.received.fetch_add(1, Ordering::Relaxed);
                callback(bytes);
            }
            None => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Payload from engine arrived before a receiver was installed");
            }
        }
    }

    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }
}

impl DuplexChannel for HostBridge {
    fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.send_to_engine(payload)
    }

    fn on_receive(&self, callback: ReceiveCallback) {
        *self.receiver.write() = Some(callback);
    }

    fn is_available(&self) -> bool {
        self.engine.read().is_some()
    }

    fn side(&self) -> Side {
        Side::Host
    }
}
