//! Ephemeral stores (Redis).
//!
//! Everything stored here expires on its own; nothing is ever deleted
//! explicitly.
//!
//! ## Stores
//!
//! - **kv** - Generic get / set-with-TTL access used by issuing and verifying
//! - **rate_limit** - Fixed-window per-client verification counters
//!
//! ## Redis Key Patterns
//!
//! ```text
//! token:{id}                        → TokenRecord JSON (expires with the token)
//! rl:ip:{ip}:{minute}               → verification count for one client minute
//! default_public_token              → raw token id (key name is configurable)
//! ```

mod kv;
mod rate_limit;

pub use kv::{KvStore, RedisStore};
pub use rate_limit::{RateLimitResult, RateLimiter, RedisRateLimiter, WindowRateLimiter};

#[cfg(test)]
pub use kv::MockKvStore;
#[cfg(test)]
pub use rate_limit::MockRateLimiter;
#[cfg(test)]
pub use rate_limit::rate_limit_key;
