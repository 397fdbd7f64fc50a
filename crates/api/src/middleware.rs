//! Request extractors.
//!
//! - **admin** - `AdminAuth`, required to issue tokens
//! - **client** - `ClientMeta`, the client IP and signals used for rate
//!   limiting and fingerprinting

pub mod admin;
pub mod client;
