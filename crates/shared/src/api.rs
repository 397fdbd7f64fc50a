//! Shared API request/response types used by clients and the API server.

use garde::Validate;
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};

/// Longest lifetime an issued token may ask for (30 days).
pub const MAX_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Request to issue a new redirect token.
///
/// Accepted both as a JSON body and as a query string, so every field is
/// optional at the wire level; a missing destination is reported by the issuer.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct IssueTokenPayload {
    /// Destination the token resolves to.
    #[garde(skip)]
    #[serde(default, alias = "redirect")]
    pub url: Option<String>,
    /// Lifetime in seconds. Falls back to the server default.
    #[garde(range(min = 1, max = MAX_TTL_SECS))]
    #[serde(default, deserialize_with = "deserialize_count")]
    pub ttl: Option<u64>,
    /// Maximum number of successful verifications. Absent means unlimited.
    #[garde(range(min = 1))]
    #[serde(default, alias = "maxUses", deserialize_with = "deserialize_count")]
    pub max_uses: Option<u64>,
    /// Also publish the token under the default-token key.
    #[garde(skip)]
    #[serde(default, alias = "setDefault", deserialize_with = "deserialize_flag")]
    pub set_default: bool,
}

/// Returned after a token is issued.
#[derive(Debug, Serialize, Deserialize)]
pub struct IssueTokenResponse {
    pub token: String,
    /// Lifetime of the token in seconds.
    pub expires_in: u64,
    /// Non-fatal problems, e.g. the default-token publish failing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Request to exchange a token (plus a passed challenge) for its destination.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct VerifyTokenPayload {
    #[serde(default, rename = "t", alias = "token")]
    pub token: Option<String>,
    /// Proof produced by the human-verification widget.
    #[serde(
        default,
        rename = "cf-turnstile-response",
        alias = "turnstile_response"
    )]
    pub challenge_response: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyTokenResponse {
    pub ok: bool,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DefaultTokenResponse {
    pub token: String,
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    /// Upstream verifier output, only present on challenge failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

/// Query strings only carry text, JSON bodies may carry booleans or numbers.
/// `null` reads as false.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        None => false,
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(n)) => n != 0,
        Some(Flag::Text(s)) => matches!(s.trim(), "1" | "true" | "yes" | "on"),
    })
}

/// Whole number given as a JSON number or as text (`60`, `"60"`).
/// `null` and blank text read as absent; anything else non-numeric is an error.
fn deserialize_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Int(u64),
        Float(f64),
        Text(String),
    }

    match Option::<Count>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Count::Int(n)) => Ok(Some(n)),
        Some(Count::Float(f)) if f >= 0.0 && f.is_finite() => Ok(Some(f.trunc() as u64)),
        Some(Count::Float(f)) => Err(D::Error::custom(format!(
            "expected a non-negative whole number, got {}",
            f
        ))),
        Some(Count::Text(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<u64>().map(Some).map_err(|_| {
                D::Error::custom(format!("expected a non-negative whole number, got {:?}", s))
            })
        }
    }
}
