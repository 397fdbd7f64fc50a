use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

fn default_ttl_seconds() -> u64 {
    300
}

fn default_rate_limit_per_min() -> u64 {
    60
}

fn default_challenge_verify_url() -> String {
    "https://challenges.cloudflare.com/turnstile/v0/siteverify".to_string()
}

fn default_challenge_timeout_secs() -> u64 {
    10
}

fn default_token_key() -> String {
    "default_public_token".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Backing store. Without it issuing and verifying report a misconfiguration.
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Shared secret required to issue tokens.
    pub admin_key: String,
    /// Lifetime used when an issue request names none, and for legacy records.
    #[serde(default = "default_ttl_seconds")]
    pub default_ttl_seconds: u64,
    /// Verification requests allowed per client IP per calendar minute.
    #[serde(default = "default_rate_limit_per_min")]
    pub rate_limit_per_min: u64,
    /// Enables fingerprint binding when set.
    #[serde(default)]
    pub fingerprint_secret: Option<String>,
    /// Secret for the human-verification service (Turnstile).
    #[serde(default)]
    pub challenge_secret: Option<String>,
    #[serde(default = "default_challenge_verify_url")]
    pub challenge_verify_url: String,
    #[serde(default = "default_challenge_timeout_secs")]
    pub challenge_timeout_secs: u64,
    /// Store key the default token is published under.
    #[serde(default = "default_token_key")]
    pub default_token_key: String,
    /// Served by get-default when the store has nothing.
    #[serde(default)]
    pub default_public_token: Option<String>,
    /// Set to "production" for JSON logging, anything else for human-readable.
    #[serde(default)]
    pub env: String,
    #[serde(default)]
    pub sentry_dsn: Option<String>,
}

impl Config {
    pub fn is_production(&self) -> bool {
        self.env == "production"
    }

    /// Checked once at startup; everything downstream trusts these values.
    pub fn validate(&self) -> Result<()> {
        if self.admin_key.trim().is_empty() {
            bail!("admin_key must not be empty");
        }
        if self.default_ttl_seconds == 0 {
            bail!("default_ttl_seconds must be at least 1");
        }
        if self.default_ttl_seconds > shared::api::MAX_TTL_SECS {
            bail!(
                "default_ttl_seconds must not exceed {}",
                shared::api::MAX_TTL_SECS
            );
        }
        if self.rate_limit_per_min == 0 {
            bail!("rate_limit_per_min must be at least 1");
        }
        if self.default_token_key.trim().is_empty() {
            bail!("default_token_key must not be empty");
        }
        Ok(())
    }

    /// Fallback token for get-default, ignoring blank values.
    pub fn fallback_token(&self) -> Option<&str> {
        self.default_public_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}
