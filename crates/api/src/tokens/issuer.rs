//! Token issuance.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;

use super::{TokenError, token_key, token_prefix};
use crate::{models::TokenRecord, stores::KvStore};

/// Random bytes per token id (144 bits), hex encoded.
pub const TOKEN_BYTES: usize = 18;

/// Warning returned when the default-token publish fails. Store details stay in the logs.
pub const DEFAULT_NOT_PUBLISHED: &str = "default token not published";

#[derive(Debug, Clone)]
pub struct IssuerSettings {
    pub default_ttl_secs: u64,
    pub default_token_key: String,
}

#[derive(Debug, Clone, Default)]
pub struct IssueRequest {
    pub redirect_url: String,
    pub ttl_secs: Option<u64>,
    pub max_uses: Option<u64>,
    /// Also publish under the default-token key (best-effort).
    pub publish_default: bool,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub ttl_secs: u64,
    /// Failures of side effects that did not fail the issuance.
    pub warnings: Vec<String>,
}

pub struct TokenIssuer {
    store: Arc<dyn KvStore>,
    settings: IssuerSettings,
}

impl TokenIssuer {
    pub fn new(store: Arc<dyn KvStore>, settings: IssuerSettings) -> Self {
        Self { store, settings }
    }

    pub async fn issue(
        &self,
        request: IssueRequest,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let redirect_url = request.redirect_url.trim();
        if redirect_url.is_empty() {
            return Err(TokenError::MissingDestination);
        }

        let ttl_secs = request
            .ttl_secs
            .filter(|t| *t > 0)
            .unwrap_or(self.settings.default_ttl_secs);
        let token = generate_token_id();

        let record = TokenRecord::new(
            token.clone(),
            redirect_url.to_string(),
            ttl_secs,
            request.max_uses.filter(|m| *m > 0),
            now,
        );
        let json = serde_json::to_string(&record).map_err(|e| TokenError::Internal(e.into()))?;

        self.store
            .set_ex(&token_key(&token), &json, ttl_secs)
            .await
            .map_err(TokenError::Upstream)?;

        let mut warnings = Vec::new();
        if request.publish_default
            && let Err(e) = self
                .store
                .set_ex(&self.settings.default_token_key, &token, ttl_secs)
                .await
        {
            tracing::warn!(
                token = %token_prefix(&token),
                key = %self.settings.default_token_key,
                "failed to publish default token: {:#}",
                e
            );
            warnings.push(DEFAULT_NOT_PUBLISHED.to_string());
        }

        tracing::info!(
            token = %token_prefix(&token),
            ttl_secs,
            max_uses = ?record.max_uses,
            published_default = request.publish_default && warnings.is_empty(),
            "token issued"
        );

        Ok(IssuedToken {
            token,
            ttl_secs,
            warnings,
        })
    }
}

/// New token id from the thread-local CSPRNG.
pub fn generate_token_id() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}
