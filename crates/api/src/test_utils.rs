//! Shared test utilities.
//!
//! Provides an in-memory [`MemoryStore`] driven by a manually advanced
//! [`TestClock`], common mock factories, and a `TestStateBuilder` for
//! constructing `AppState` instances with only the collaborators each test
//! needs.
//!
//! ## Usage
//!
//! ```ignore
//! let clock = TestClock::new();
//! let store = Arc::new(MemoryStore::new(clock.clone()));
//!
//! let state = TestStateBuilder::new()
//!     .with_store(store.clone())
//!     .with_challenge(passing_challenge())
//!     .build();
//! ```

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::config::Config;
use crate::services::{ChallengeOutcome, ChallengeVerifier, MockChallengeVerifier};
use crate::state::AppState;
use crate::stores::{KvStore, RateLimiter};
use crate::tokens::FingerprintBinder;

/// Creates a test configuration with dummy values.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 3000,
        redis_url: Some("redis://test".to_string()),
        admin_key: "test-admin-key".to_string(),
        default_ttl_seconds: 300,
        rate_limit_per_min: 60,
        fingerprint_secret: None,
        challenge_secret: Some("test-secret".to_string()),
        challenge_verify_url: "http://127.0.0.1:9/siteverify".to_string(),
        challenge_timeout_secs: 1,
        default_token_key: "default_public_token".to_string(),
        default_public_token: None,
        env: "test".to_string(),
        sentry_dsn: None,
    }
}

/// Challenge verifier that accepts every proof.
pub fn passing_challenge() -> MockChallengeVerifier {
    let mut challenge = MockChallengeVerifier::new();
    challenge.expect_verify().returning(|_, _| {
        Ok(ChallengeOutcome {
            success: true,
            detail: serde_json::json!({ "success": true }),
        })
    });
    challenge
}

/// Shared, manually advanced clock. Starts on a minute boundary.
#[derive(Clone)]
pub struct TestClock(Arc<Mutex<DateTime<Utc>>>);

impl TestClock {
    pub fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 1, 1, 12, 0, 0)
            .single()
            .expect("valid start time");
        Self(Arc::new(Mutex::new(start)))
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }

    pub fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

struct Entry {
    value: String,
    ttl_secs: u64,
    expires_at: DateTime<Utc>,
}

/// In-memory KvStore honouring TTLs against a [`TestClock`].
pub struct MemoryStore {
    clock: TestClock,
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new(clock: TestClock) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Write directly, bypassing any component.
    pub fn insert_raw(&self, key: &str, value: &str, ttl_secs: u64) {
        let expires_at = self.clock.now() + Duration::seconds(ttl_secs as i64);
        self.entries.lock().unwrap().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                ttl_secs,
                expires_at,
            },
        );
    }

    /// Current value if not expired.
    pub fn raw(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.value.clone())
    }

    /// TTL used by the last write of `key`, if still live.
    pub fn ttl_secs(&self, key: &str) -> Option<u64> {
        let now = self.clock.now();
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.ttl_secs)
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.raw(key))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.insert_raw(key, value, ttl_secs.max(1));
        Ok(())
    }
}

/// Builder for constructing test `AppState` with custom collaborators.
///
/// Anything not set stays unconfigured, which is how the misconfiguration
/// paths are exercised.
pub struct TestStateBuilder {
    config: Config,
    store: Option<Arc<dyn KvStore>>,
    rate_limiter: Option<Arc<dyn RateLimiter>>,
    challenge: Option<Arc<dyn ChallengeVerifier>>,
}

impl TestStateBuilder {
    /// Creates a new builder with nothing configured.
    pub fn new() -> Self {
        Self {
            config: test_config(),
            store: None,
            rate_limiter: None,
            challenge: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn with_challenge(mut self, challenge: MockChallengeVerifier) -> Self {
        self.challenge = Some(Arc::new(challenge));
        self
    }

    /// Builds the `AppState`; fingerprinting follows `config.fingerprint_secret`.
    pub fn build(self) -> AppState {
        let fingerprint = self
            .config
            .fingerprint_secret
            .as_deref()
            .map(|secret| FingerprintBinder::new(secret).expect("valid fingerprint secret"));

        AppState {
            config: self.config,
            store: self.store,
            rate_limiter: self.rate_limiter,
            challenge: self.challenge,
            fingerprint,
        }
    }
}

impl Default for TestStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
