//! # Host Bridge Test Suite
//!
//! Cross-crate tests that run the engine side and the host side together.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs        # Runtime builders and scripted providers
//!     ├── e2e_operations.rs  # Ads and purchases through Start/Poll
//!     └── flows.rs           # Transport, RPC and storage behaviour
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p hb-tests
//! cargo test -p hb-tests integration::e2e_operations::
//! cargo bench -p hb-tests
//! ```

#![allow(dead_code)]

pub mod integration;
