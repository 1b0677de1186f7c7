//! Operation timing configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationConfig {
    /// Idle time after which an unpolled operation is evicted
    pub ttl_secs: u64,
    /// How often the host sweeps for idle operations
    pub sweep_interval_secs: u64,
    /// Delay between engine polls
    pub poll_interval_ms: u64,
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            sweep_interval_secs: 30,
            poll_interval_ms: 500,
        }
    }
}

impl OperationConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
