//! Host services exposed over the bridge.
//!
//! Each feature has a `host` half (service descriptor and the provider
//! port a platform SDK implements) and an `engine` half (typed client and,
//! where there is policy to apply, a use case).

pub mod ad;
pub mod iap;
pub mod storage;
