//! Error types for long-running operations

use hb_03_rpc_multiplexer::RpcError;
use thiserror::Error;

/// Errors seen by the engine while driving an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// The host answered Start with the empty operation id.
    #[error("Operation could not be started")]
    NotStarted,

    /// Start or Poll failed at the RPC level.
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Why a host-side starter declined to begin a flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    /// The flow is not available here. Start answers with the empty id.
    #[error("Not supported: {0}")]
    Unsupported(String),

    /// The request was refused. Start answers with a handler error.
    #[error("Rejected: {0}")]
    Rejected(String),
}

/// An exclusive operation with the same key is still running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Operation already running for {key}")]
pub struct ContentionError {
    pub key: String,
}
