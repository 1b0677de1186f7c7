//! Adapters connecting the bridge ports to concrete platforms.

pub mod loopback;
