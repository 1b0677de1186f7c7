//! Engine side of the bridge.

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::payload;
use crate::ports::{DuplexChannel, EntrypointHandler, HostDispatch, ReceiveCallback};
use crate::stats::TransportStats;
use crate::Side;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Engine-side endpoint.
///
/// Outbound payloads go through the host's dispatch function under the
/// configured event name. Inbound payloads arrive through [`invoke`], the
/// single entrypoint the host calls by object and method name.
///
/// [`invoke`]: EngineBridge::invoke
pub struct EngineBridge {
    config: TransportConfig,
    host: RwLock<Option<Arc<dyn HostDispatch>>>,
    receiver: RwLock<Option<ReceiveCallback>>,
    entrypoints: RwLock<HashMap<String, EntrypointHandler>>,
    stats: TransportStats,
}

impl EngineBridge {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            host: RwLock::new(None),
            receiver: RwLock::new(None),
            entrypoints: RwLock::new(HashMap::new()),
            stats: TransportStats::default(),
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Wire the host's dispatch function.
    pub fn connect_host(&self, host: Arc<dyn HostDispatch>) {
        *self.host.write() = Some(host);
        debug!(event_name = %self.config.event_name, "Engine bridge connected to host");
    }

    pub fn disconnect_host(&self) {
        *self.host.write() = None;
    }

    /// Send an opaque payload to the host.
    pub fn send_to_host(&self, payload: &[u8]) -> Result<(), TransportError> {
        let host = self
            .host
            .read()
            .clone()
            .ok_or(TransportError::Unavailable(Side::Engine))?;

        let text = payload::encode(payload);
        host.dispatch_event(&self.config.event_name, &text);
        self.stats.sent.fetch_add(1, Ordering::Relaxed);
        trace!(bytes = payload.len(), "Dispatched payload to host");
        Ok(())
    }

    /// Register a handler for a non-RPC entrypoint method.
    pub fn register_entrypoint(&self, method_name: impl Into<String>, handler: EntrypointHandler) {
        self.entrypoints.write().insert(method_name.into(), handler);
    }

    /// The engine entrypoint: the host calls this by method name with one
    /// string argument.
    pub fn invoke(&self, method_name: &str, argument: &str) {
        if method_name == self.config.entrypoint_method {
            self.receive_message_from_host(argument);
            return;
        }

        let handler = self.entrypoints.read().get(method_name).cloned();
        match handler {
            Some(handler) => handler(argument),
            None => {
                self.stats.ignored.fetch_add(1, Ordering::Relaxed);
                warn!(method = method_name, "No engine entrypoint registered");
            }
        }
    }

    /// Decode an inbound RPC payload and hand it to the receive callback.
    pub fn receive_message_from_host(&self, base64_payload: &str) {
        let bytes = match payload::decode(base64_payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Dropping undecodable payload from host");
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
                warn!("Payload from host arrived before a receiver was installed");
            }
        }
    }

    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }
}

impl DuplexChannel for EngineBridge {
    fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.send_to_host(payload)
    }

    fn on_receive(&self, callback: ReceiveCallback) {
        *self.receiver.write() = Some(callback);
    }

    fn is_available(&self) -> bool {
        self.host.read().is_some()
    }

    fn side(&self) -> Side {
        Side::Engine
    }
}
