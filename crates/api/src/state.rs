use std::sync::Arc;

use crate::{
    config::Config,
    error::AppError,
    services::ChallengeVerifier,
    stores::{KvStore, RateLimiter, WindowRateLimiter},
    tokens::{FingerprintBinder, IssuerSettings, TokenIssuer, TokenVerifier, VerifierSettings},
};

#[derive(Clone)]
pub struct AppState {
    /// Application configuration, validated at startup.
    pub config: Config,
    /// Backing store (Redis). `None` when not configured.
    pub store: Option<Arc<dyn KvStore>>,
    /// Rate limiter. Falls back to the read-then-write limiter over `store`.
    pub rate_limiter: Option<Arc<dyn RateLimiter>>,
    /// Human-verification service (Turnstile). `None` when no secret is configured.
    pub challenge: Option<Arc<dyn ChallengeVerifier>>,
    /// Fingerprint binding, enabled by a configured secret.
    pub fingerprint: Option<FingerprintBinder>,
}

impl AppState {
    fn store(&self) -> Result<Arc<dyn KvStore>, AppError> {
        self.store
            .clone()
            .ok_or(AppError::Misconfigured("backing store not configured"))
    }

    pub fn issuer(&self) -> Result<TokenIssuer, AppError> {
        Ok(TokenIssuer::new(
            self.store()?,
            IssuerSettings {
                default_ttl_secs: self.config.default_ttl_seconds,
                default_token_key: self.config.default_token_key.clone(),
            },
        ))
    }

    pub fn verifier(&self) -> Result<TokenVerifier, AppError> {
        let store = self.store()?;
        let challenge = self
            .challenge
            .clone()
            .ok_or(AppError::Misconfigured("challenge verifier not configured"))?;
        let rate_limiter = self
            .rate_limiter
            .clone()
            .unwrap_or_else(|| Arc::new(WindowRateLimiter::new(store.clone())));

        Ok(TokenVerifier::new(
            store,
            challenge,
            rate_limiter,
            self.fingerprint.clone(),
            VerifierSettings {
                default_ttl_secs: self.config.default_ttl_seconds,
                rate_limit_per_min: self.config.rate_limit_per_min,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenRecord;
    use crate::stores::{MockRateLimiter, RateLimitResult};
    use crate::test_utils::{MemoryStore, TestClock, TestStateBuilder, passing_challenge};
    use crate::tokens::{ClientSignals, TokenError, VerifyRequest, token_key};

    #[test]
    fn missing_store_is_misconfiguration() {
        let state = TestStateBuilder::new().with_challenge(passing_challenge()).build();

        assert!(matches!(state.issuer(), Err(AppError::Misconfigured(_))));
        assert!(matches!(state.verifier(), Err(AppError::Misconfigured(_))));
    }

    #[test]
    fn missing_challenge_only_blocks_verification() {
        let store = Arc::new(MemoryStore::new(TestClock::new()));
        let state = TestStateBuilder::new().with_store(store).build();

        assert!(state.issuer().is_ok());
        assert!(matches!(state.verifier(), Err(AppError::Misconfigured(_))));
    }

    #[test]
    fn fingerprint_follows_config() {
        let config = crate::config::Config {
            fingerprint_secret: Some("s".to_string()),
            ..crate::test_utils::test_config()
        };
        let state = TestStateBuilder::new().with_config(config).build();
        assert!(state.fingerprint.is_some());

        let state = TestStateBuilder::new().build();
        assert!(state.fingerprint.is_none());
    }

    #[tokio::test]
    async fn verifier_prefers_injected_rate_limiter() {
        let clock = TestClock::new();
        let store = Arc::new(MemoryStore::new(clock.clone()));
        let record = TokenRecord::new("abc".into(), "https://x.test".into(), 60, None, clock.now());
        store.insert_raw(&token_key("abc"), &serde_json::to_string(&record).unwrap(), 60);

        let mut limiter = MockRateLimiter::new();
        limiter
            .expect_check_window()
            .times(1)
            .returning(|_, _, _| Ok(RateLimitResult::Exceeded(60)));

        let state = TestStateBuilder::new()
            .with_store(store.clone())
            .with_rate_limiter(Arc::new(limiter))
            .with_challenge(passing_challenge())
            .build();

        let request = VerifyRequest {
            token: "abc".to_string(),
            proof: "proof".to_string(),
            client: ClientSignals {
                ip: Some("203.0.113.1".to_string()),
                ..Default::default()
            },
        };
        let result = state.verifier().unwrap().verify(&request, clock.now()).await;

        assert!(matches!(result, Err(TokenError::RateLimited)));
        // The store-backed fallback would have written a window counter.
        assert_eq!(store.raw(&crate::stores::rate_limit_key("203.0.113.1", clock.now())), None);
    }
}
