//! End-to-end tests over the loopback transport.

#[cfg(test)]
mod fixtures;

pub mod e2e_operations;
pub mod flows;
