//! Multiplexer configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Time a caller waits for a response. 0 waits forever.
    pub call_timeout_ms: u64,
    /// How often abandoned pending calls are swept
    pub sweep_interval_ms: u64,
    /// Idle encode buffers kept for reuse
    pub max_pooled_buffers: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 30_000,
            sweep_interval_ms: 5_000,
            max_pooled_buffers: 32,
        }
    }
}

impl RpcConfig {
    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_ms > 0).then(|| Duration::from_millis(self.call_timeout_ms))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}
