//! Port definitions.
//!
//! Driven ports are the raw platform primitives; the driving port is the
//! duplex byte channel the multiplexer talks to.

use crate::error::TransportError;
use crate::Side;
use bytes::Bytes;
use std::sync::Arc;

/// Engine to host: the external dispatch function the host page installs.
pub trait HostDispatch: Send + Sync {
    fn dispatch_event(&self, event_name: &str, payload: &str);
}

/// Host to engine: invoke a named method on a named engine object with one
/// string argument.
pub trait EngineInvoke: Send + Sync {
    fn send_message(&self, object_name: &str, method_name: &str, argument: &str);
}

/// Called with every decoded inbound payload.
pub type ReceiveCallback = Arc<dyn Fn(Bytes) + Send + Sync>;

/// Called with the raw string argument of a non-RPC engine entrypoint.
pub type EntrypointHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Logical duplex channel carrying opaque bytes.
pub trait DuplexChannel: Send + Sync {
    /// Send bytes to the other side. Fails fast when no peer is attached.
    fn send(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// Install the inbound callback, replacing any previous one.
    fn on_receive(&self, callback: ReceiveCallback);

    /// Whether a send would currently reach a peer.
    fn is_available(&self) -> bool;

    fn side(&self) -> Side;
}
