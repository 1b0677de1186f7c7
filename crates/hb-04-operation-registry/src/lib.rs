//! # HB-04 Operation Registry
//!
//! Long-running operations over a transport that cannot push: the engine
//! starts an operation with one call, then repeatedly polls for the events
//! it produced.
//!
//! ## Protocol
//!
//! ```text
//! engine                                  host
//!   │ Start(params) ───────────────────────►│ entry {[], finished=false}
//!   │◄─────────────── { operation_id }      │ (created before any event)
//!   │                                       │ callback: push(impression)
//!   │ Poll(id) ────────────────────────────►│ drain queue
//!   │◄────────── { [impression], false }    │
//!   │                                       │ callback: push(dismissed), finish
//!   │ Poll(id) ────────────────────────────►│ drain queue, then delete entry
//!   │◄────────── { [dismissed], true }      │
//!   │ Poll(id) ────────────────────────────►│ unknown id
//!   │◄────────── { [], true }               │
//! ```
//!
//! ## Rules
//!
//! - An unknown id (already collected, evicted, or never issued) polls as
//!   `{[], true}`. That is the stop signal, not an error.
//! - The empty id means the flow could not start; no entry exists for it.
//! - Failures after a successful start travel as terminal events through
//!   the normal poll path.
//! - Entries nobody polls are evicted after a TTL measured from their last
//!   activity.
//!
//! ## Layers
//!
//! - `registry`: the per-feature operation table and its producer handle
//! - `service`: registers a Start/Poll method pair on a service descriptor
//! - `client`: the engine-side poll loop as a lazy event stream

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod messages;
pub mod registry;
pub mod service;

pub use client::OperationClient;
pub use config::OperationConfig;
pub use error::{ContentionError, OperationError, StartError};
pub use messages::{PollEventsRequest, PollEventsResponse, StartOperationResponse};
pub use registry::{sweep_task, EventSink, OperationRegistry, OperationStats, PollOutcome};
pub use service::{LongRunningMethods, OperationServiceExt};
