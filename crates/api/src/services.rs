//! External service abstractions.
//!
//! Each service is abstracted behind a trait to enable mocking in tests.
//!
//! ## Services
//!
//! - **challenge** - Human-verification proof checks (Cloudflare Turnstile)

mod challenge;

pub use challenge::{ChallengeOutcome, ChallengeVerifier, TurnstileVerifier};

#[cfg(test)]
pub use challenge::MockChallengeVerifier;
