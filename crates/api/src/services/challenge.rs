//! Human-verification challenge checks.
//!
//! Uses the Turnstile siteverify API:
//! https://developers.cloudflare.com/turnstile/get-started/server-side-validation/

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

/// What the verifier said about a proof.
#[derive(Debug, Clone)]
pub struct ChallengeOutcome {
    pub success: bool,
    /// Raw verifier response, surfaced to the caller on failure.
    pub detail: serde_json::Value,
}

/// Checks a client-supplied challenge proof.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChallengeVerifier: Send + Sync {
    /// Verify `proof`, optionally bound to the client's IP.
    /// `Err` means the verifier itself could not be reached or understood.
    async fn verify(&self, proof: &str, remote_ip: Option<String>) -> Result<ChallengeOutcome>;
}

/// Turnstile implementation of ChallengeVerifier.
#[derive(Clone)]
pub struct TurnstileVerifier {
    http: reqwest::Client,
    verify_url: String,
    secret: String,
}

impl TurnstileVerifier {
    pub fn new(
        verify_url: impl Into<String>,
        secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build challenge HTTP client")?;

        Ok(Self {
            http,
            verify_url: verify_url.into(),
            secret: secret.into(),
        })
    }
}

#[async_trait]
impl ChallengeVerifier for TurnstileVerifier {
    async fn verify(&self, proof: &str, remote_ip: Option<String>) -> Result<ChallengeOutcome> {
        let mut form = vec![("secret", self.secret.as_str()), ("response", proof)];
        if let Some(ip) = remote_ip.as_deref() {
            form.push(("remoteip", ip));
        }

        let response = self
            .http
            .post(&self.verify_url)
            .form(&form)
            .send()
            .await
            .context("challenge verification request failed")?;

        let status = response.status();
        // Turnstile reports rejections in the body, so non-2xx bodies are still read.
        let detail: serde_json::Value = response
            .json()
            .await
            .with_context(|| format!("unreadable challenge verification response ({})", status))?;

        let success = detail
            .get("success")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        Ok(ChallengeOutcome { success, detail })
    }
}
