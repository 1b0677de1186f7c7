//! # HB-03 RPC Multiplexer
//!
//! Request/response RPC on top of the one-way duplex channel. One
//! multiplexer runs on each side; either side can serve and call.
//!
//! ## Flow
//!
//! ```text
//!   caller                       channel                      callee
//!     │ call("Svc.M", req)          │                             │
//!     │ ── register token ──┐       │                             │
//!     │                     ▼       │                             │
//!     │ ── Envelope{Request, token} ──────────────────────────────►│
//!     │                             │      lookup "Svc.M"         │
//!     │                             │      decode req, invoke     │
//!     │◄──────────────────────────────── Envelope{Response, token}│
//!     │ match token, decode resp    │                             │
//! ```
//!
//! ## Guarantees
//!
//! - Every inbound request gets exactly one response envelope with its
//!   token, whether the handler succeeded, failed, or did not exist.
//! - Responses are matched by token, never by arrival order. Requests are
//!   handled concurrently and may finish out of order.
//! - With no peer attached, calls fail immediately with
//!   `TRANSPORT_UNAVAILABLE`; nothing is queued.
//! - Cancelling a call only stops the local wait. The remote side still
//!   runs the handler; its response is dropped as unknown.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![deny(unsafe_code)]

pub mod config;
pub mod envelope;
pub mod error;
pub mod multiplexer;
pub mod pending;
pub mod service;

pub use config::RpcConfig;
pub use envelope::{Envelope, EnvelopeKind, RpcErrorBody};
pub use error::{RegistryError, RpcError};
pub use multiplexer::{MultiplexerStats, RpcMultiplexer};
pub use pending::{PendingRequestStore, PendingResponse, PendingStats};
pub use service::{method_selector, MethodHandler, ServiceDescriptor};
pub use shared_types::codes;
