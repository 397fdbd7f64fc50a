use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Redirect token stored in Redis under `token:{id}`.
///
/// The store-level expiry always tracks `created_at + ttl_seconds`: every
/// rewrite recomputes the remaining lifetime instead of extending it.
/// Field names match the JSON earlier deployments wrote, so old records keep
/// resolving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub token: String,
    /// Destination. Never changes after issuance.
    pub redirect_url: String,
    /// Milliseconds since the epoch.
    pub created_at: i64,
    /// Lifetime granted at issuance.
    pub ttl_seconds: u64,
    /// Successful verifications so far.
    pub uses: u64,
    #[serde(default)]
    pub max_uses: Option<u64>,
    /// Milliseconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<i64>,
    /// HMAC of the client signals seen on first verification.
    #[serde(
        default,
        rename = "bindFingerprint",
        alias = "boundFingerprint",
        skip_serializing_if = "Option::is_none"
    )]
    pub bound_fingerprint: Option<String>,
}

impl TokenRecord {
    pub fn new(
        token: String,
        redirect_url: String,
        ttl_seconds: u64,
        max_uses: Option<u64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            token,
            redirect_url,
            created_at: now.timestamp_millis(),
            ttl_seconds,
            uses: 0,
            max_uses,
            last_used_at: None,
            bound_fingerprint: None,
        }
    }

    /// End of the original lifetime, in epoch milliseconds.
    pub fn expires_at_ms(&self) -> i64 {
        self.created_at
            .saturating_add((self.ttl_seconds as i64).saturating_mul(1000))
    }

    /// True once the original lifetime has passed, whatever the store says.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() >= self.expires_at_ms()
    }

    /// Seconds left in the original window, never below 1 so a rewrite can't
    /// turn into a "no expiry" write.
    pub fn remaining_ttl_secs(&self, now: DateTime<Utc>) -> u64 {
        let remaining_ms = self.expires_at_ms() - now.timestamp_millis();
        remaining_ms.div_euclid(1000).max(1) as u64
    }

    /// Decode a stored value.
    ///
    /// Values that are not a token record at all (e.g. a bare URL written by
    /// an older issuer) come back as [`StoredToken::Legacy`], with the raw
    /// value as destination, zero uses, and `default_ttl` starting `now`.
    pub fn decode(token: &str, raw: &str, default_ttl: u64, now: DateTime<Utc>) -> StoredToken {
        match serde_json::from_str::<StoredRecord>(raw) {
            Ok(stored) => StoredToken::Current(Self {
                token: stored.token.unwrap_or_else(|| token.to_string()),
                redirect_url: stored.redirect_url,
                created_at: stored.created_at.unwrap_or_else(|| now.timestamp_millis()),
                ttl_seconds: stored.ttl_seconds.filter(|t| *t > 0).unwrap_or(default_ttl),
                uses: stored.uses.unwrap_or(0),
                max_uses: stored.max_uses.filter(|m| *m > 0),
                last_used_at: stored.last_used_at,
                bound_fingerprint: stored.bound_fingerprint,
            }),
            Err(_) => StoredToken::Legacy(Self::new(
                token.to_string(),
                raw.to_string(),
                default_ttl,
                None,
                now,
            )),
        }
    }
}

/// Outcome of [`TokenRecord::decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredToken {
    /// A JSON token record.
    Current(TokenRecord),
    /// A raw value treated as the destination.
    Legacy(TokenRecord),
}

impl StoredToken {
    pub fn is_legacy(&self) -> bool {
        matches!(self, StoredToken::Legacy(_))
    }

    pub fn into_record(self) -> TokenRecord {
        match self {
            StoredToken::Current(record) | StoredToken::Legacy(record) => record,
        }
    }
}

/// Stored shape as read back; older records may lack bookkeeping fields.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    #[serde(default)]
    token: Option<String>,
    redirect_url: String,
    #[serde(default)]
    created_at: Option<i64>,
    #[serde(default)]
    ttl_seconds: Option<u64>,
    #[serde(default)]
    uses: Option<u64>,
    #[serde(default)]
    max_uses: Option<u64>,
    #[serde(default)]
    last_used_at: Option<i64>,
    #[serde(default, rename = "bindFingerprint", alias = "boundFingerprint")]
    bound_fingerprint: Option<String>,
}
