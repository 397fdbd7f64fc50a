//! Token verification.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{
    Binding, ClientSignals, FingerprintBinder, TokenError, UsageGuard, token_key, token_prefix,
};
use crate::{
    models::TokenRecord,
    services::ChallengeVerifier,
    stores::{KvStore, RateLimiter},
};

#[derive(Debug, Clone)]
pub struct VerifierSettings {
    /// Lifetime given to legacy values that carry none.
    pub default_ttl_secs: u64,
    pub rate_limit_per_min: u64,
}

#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub token: String,
    /// Human-verification proof.
    pub proof: String,
    pub client: ClientSignals,
}

pub struct TokenVerifier {
    store: Arc<dyn KvStore>,
    challenge: Arc<dyn ChallengeVerifier>,
    rate_limiter: Arc<dyn RateLimiter>,
    /// `None` disables binding.
    fingerprint: Option<FingerprintBinder>,
    settings: VerifierSettings,
}

impl TokenVerifier {
    pub fn new(
        store: Arc<dyn KvStore>,
        challenge: Arc<dyn ChallengeVerifier>,
        rate_limiter: Arc<dyn RateLimiter>,
        fingerprint: Option<FingerprintBinder>,
        settings: VerifierSettings,
    ) -> Self {
        Self {
            store,
            challenge,
            rate_limiter,
            fingerprint,
            settings,
        }
    }

    /// Run the full pipeline and return the committed record.
    pub async fn verify(
        &self,
        request: &VerifyRequest,
        now: DateTime<Utc>,
    ) -> Result<TokenRecord, TokenError> {
        let token = token_prefix(&request.token);
        let client_ip = request.client.ip.as_deref();

        let outcome = self
            .challenge
            .verify(&request.proof, request.client.ip.clone())
            .await
            .map_err(TokenError::Upstream)?;
        if !outcome.success {
            tracing::warn!(token = %token, client_ip = ?client_ip, detail = %outcome.detail, "challenge failed");
            return Err(TokenError::ChallengeFailed(outcome.detail));
        }

        let key = token_key(&request.token);
        let raw = self.store.get(&key).await?.ok_or(TokenError::NotFound)?;

        let stored = TokenRecord::decode(&request.token, &raw, self.settings.default_ttl_secs, now);
        if stored.is_legacy() {
            tracing::info!(token = %token, "resolving legacy token value");
        }
        let mut record = stored.into_record();
        if record.is_stale(now) {
            tracing::debug!(token = %token, "token past its window but still in store");
            return Err(TokenError::NotFound);
        }

        if let Some(ip) = client_ip {
            let result = self
                .rate_limiter
                .check_window(ip, self.settings.rate_limit_per_min, now)
                .await?;
            if !result.is_allowed() {
                tracing::warn!(token = %token, client_ip = %ip, "verification rate limited");
                return Err(TokenError::RateLimited);
            }
        }

        if let Some(binder) = &self.fingerprint
            && binder.bind(&mut record, &request.client) == Binding::Mismatch
        {
            tracing::warn!(token = %token, client_ip = ?client_ip, "fingerprint mismatch");
            return Err(TokenError::FingerprintMismatch);
        }

        if let Err(e) = UsageGuard::check(&record) {
            tracing::warn!(token = %token, uses = record.uses, max_uses = ?record.max_uses, "token exhausted");
            return Err(e);
        }

        record.uses += 1;
        record.last_used_at = Some(now.timestamp_millis());
        let ttl_secs = record.remaining_ttl_secs(now);

        let json = serde_json::to_string(&record).map_err(|e| TokenError::Internal(e.into()))?;
        self.store.set_ex(&key, &json, ttl_secs).await?;

        tracing::info!(
            token = %token,
            uses = record.uses,
            max_uses = ?record.max_uses,
            remaining_secs = ttl_secs,
            "token verified"
        );

        Ok(record)
    }
}
