//! Transport naming configuration.

use crate::{ENTRYPOINT_METHOD, ENTRYPOINT_OBJECT, RPC_EVENT_NAME, VISIBILITY_METHOD};
use serde::{Deserialize, Serialize};

/// Names both sides must agree on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Event name for engine-to-host RPC payloads
    pub event_name: String,
    /// Engine object the host invokes
    pub entrypoint_object: String,
    /// Engine method receiving RPC payloads
    pub entrypoint_method: String,
    /// Engine method receiving visibility changes
    pub visibility_method: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            event_name: RPC_EVENT_NAME.to_string(),
            entrypoint_object: ENTRYPOINT_OBJECT.to_string(),
            entrypoint_method: ENTRYPOINT_METHOD.to_string(),
            visibility_method: VISIBILITY_METHOD.to_string(),
        }
    }
}
