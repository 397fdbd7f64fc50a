//! Device fingerprint binding.
//!
//! The fingerprint is `HMAC-SHA256(secret, "{user_agent}|{accept_language}|{ip_prefix}")`,
//! hex encoded. The IP contributes only its network part so a client hopping
//! between addresses in the same /24 (or IPv6 equivalent) keeps matching.

use anyhow::{Result, anyhow};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::models::TokenRecord;

/// What the client told us about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSignals {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
}

/// Result of binding a record to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// The record had no fingerprint and now carries this client's.
    Bound,
    /// The record's fingerprint matches this client.
    Matched,
    /// The record belongs to another client; it was left untouched.
    Mismatch,
}

/// Drop the last octet (IPv4) or segment (IPv6) of an address.
pub fn ip_prefix(ip: &str) -> &str {
    let separator = if ip.contains(':') { ':' } else { '.' };
    match ip.rfind(separator) {
        Some(idx) => &ip[..idx],
        None => ip,
    }
}

#[derive(Clone)]
pub struct FingerprintBinder {
    mac: Hmac<Sha256>,
}

impl FingerprintBinder {
    pub fn new(secret: &str) -> Result<Self> {
        let mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .map_err(|_| anyhow!("invalid fingerprint secret"))?;
        Ok(Self { mac })
    }

    pub fn fingerprint(&self, signals: &ClientSignals) -> String {
        let raw = format!(
            "{}|{}|{}",
            signals.user_agent.as_deref().unwrap_or(""),
            signals.accept_language.as_deref().unwrap_or(""),
            signals.ip.as_deref().map(ip_prefix).unwrap_or(""),
        );

        let mut mac = self.mac.clone();
        mac.update(raw.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Bind on first use, enforce the match afterwards. A bound fingerprint
    /// is never replaced.
    pub fn bind(&self, record: &mut TokenRecord, signals: &ClientSignals) -> Binding {
        let fp = self.fingerprint(signals);
        match record.bound_fingerprint.as_deref() {
            None => {
                record.bound_fingerprint = Some(fp);
                Binding::Bound
            }
            Some(bound) if bool::from(bound.as_bytes().ct_eq(fp.as_bytes())) => Binding::Matched,
            Some(_) => Binding::Mismatch,
        }
    }
}
