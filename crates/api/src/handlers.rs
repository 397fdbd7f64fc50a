//! HTTP handlers.
//!
//! - **tokens** - issue, verify, and default-token lookup
//! - **health** - liveness and store reachability

pub mod health;
pub mod tokens;
