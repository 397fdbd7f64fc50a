//! Redirect token lifecycle.
//!
//! A token is written once by [`TokenIssuer`] and then read, checked, and
//! rewritten by every successful [`TokenVerifier::verify`] until its original
//! window closes or its use budget runs out.
//!
//! ## Verification pipeline
//!
//! ```text
//! challenge → load token:{id} → decode (legacy fallback) → rate limit
//!           → fingerprint binding → usage guard → commit (uses+1, shrinking TTL)
//! ```
//!
//! Each stage short-circuits with a [`TokenError`].
//!
//! ## Concurrency
//!
//! Usage counting is a read-modify-write over two store calls. Two
//! verifications racing on the same record can both read the same `uses`
//! and both be admitted, so a token may be used up to once per racing
//! request beyond its cap. Nothing is retried.

mod default_pointer;
mod fingerprint;
mod issuer;
mod usage;
mod verifier;

pub use default_pointer::read_default_token;
pub use fingerprint::{Binding, ClientSignals, FingerprintBinder};
pub use issuer::{IssueRequest, IssuerSettings, TokenIssuer};
pub use usage::UsageGuard;
pub use verifier::{TokenVerifier, VerifierSettings, VerifyRequest};

use std::fmt;

/// Store key of a token record.
pub fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

/// Leading characters of a token, safe to put in logs.
pub(crate) fn token_prefix(token: &str) -> String {
    token.chars().take(8).collect()
}

/// Why issuing or verifying a token failed.
///
/// Not a `std::error::Error`; handlers wrap it in `AppError::Token`.
#[derive(Debug)]
pub enum TokenError {
    /// Issue request without a destination.
    MissingDestination,
    /// The challenge verifier rejected the proof; carries its response.
    ChallengeFailed(serde_json::Value),
    /// Absent, expired, or never issued.
    NotFound,
    /// Client exceeded its per-minute verification budget.
    RateLimited,
    /// Client signals differ from the ones the token was bound to.
    FingerprintMismatch,
    /// `uses` reached `max_uses`.
    UsageExhausted,
    /// A collaborator (store, challenge verifier) failed.
    Upstream(anyhow::Error),
    /// Anything else unexpected.
    Internal(anyhow::Error),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::MissingDestination => write!(f, "missing destination url"),
            TokenError::ChallengeFailed(_) => write!(f, "challenge failed"),
            TokenError::NotFound => write!(f, "token not found or expired"),
            TokenError::RateLimited => write!(f, "rate limit exceeded"),
            TokenError::FingerprintMismatch => write!(f, "fingerprint mismatch"),
            TokenError::UsageExhausted => write!(f, "token max uses reached"),
            TokenError::Upstream(e) => write!(f, "upstream failure: {:#}", e),
            TokenError::Internal(e) => write!(f, "internal error: {:#}", e),
        }
    }
}

impl From<anyhow::Error> for TokenError {
    fn from(err: anyhow::Error) -> Self {
        Self::Upstream(err)
    }
}
