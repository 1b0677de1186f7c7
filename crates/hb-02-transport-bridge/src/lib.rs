//! # HB-02 Transport Bridge
//!
//! Turns the two primitives the platform gives us into one logical duplex
//! byte channel per side:
//!
//! ```text
//!        ENGINE                                         HOST
//! ┌──────────────────┐  dispatch_event(name, b64)  ┌──────────────────┐
//! │   EngineBridge   │ ──────────────────────────► │    HostBridge    │
//! │                  │                             │                  │
//! │ send_to_host()   │  send_message(obj, m, b64)  │ send_to_engine() │
//! │ on_receive()     │ ◄────────────────────────── │ on_receive()     │
//! └──────────────────┘                             └──────────────────┘
//! ```
//!
//! Both primitives are fire-and-forget text calls. Payload bytes are base64
//! encoded before crossing and decoded on arrival.
//!
//! ## Guarantees
//!
//! - Sends from one side arrive in the order they were made.
//! - No acknowledgement, no retry. A lost message is simply gone; the layers
//!   above must tolerate that.
//! - A side with nothing wired on the other end fails synchronously with
//!   [`TransportError::Unavailable`] instead of queueing.
//!
//! ## Adapters
//!
//! - `adapters::loopback`: wires an engine bridge and a host bridge in the
//!   same process, with a switch to simulate message loss.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![deny(unsafe_code)]

pub mod adapters;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
mod payload;
pub mod ports;
pub mod stats;

pub use adapters::loopback::{connect_loopback, LoopbackLink};
pub use config::TransportConfig;
pub use engine::EngineBridge;
pub use error::TransportError;
pub use host::HostBridge;
pub use ports::{DuplexChannel, EngineInvoke, EntrypointHandler, HostDispatch, ReceiveCallback};
pub use stats::TransportStats;

use std::fmt;

/// Event name the engine dispatches every RPC payload under.
pub const RPC_EVENT_NAME: &str = "HostBridge_RpcMessage";

/// Engine object the host addresses.
pub const ENTRYPOINT_OBJECT: &str = "HostBridge";

/// Engine method receiving RPC payloads from the host.
pub const ENTRYPOINT_METHOD: &str = "ReceiveMessageFromHost";

/// Engine method receiving host visibility changes.
pub const VISIBILITY_METHOD: &str = "OnHostVisibilityChanged";

/// Which runtime a component lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Engine,
    Host,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Engine => f.write_str("engine"),
            Side::Host => f.write_str("host"),
        }
    }
}
