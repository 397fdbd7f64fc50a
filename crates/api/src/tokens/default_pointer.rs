//! Lookup of the published default token.

use crate::stores::KvStore;

/// Token currently published under `key`, falling back to `fallback` when
/// the store is missing, failing, or holds nothing.
pub async fn read_default_token(
    store: Option<&dyn KvStore>,
    key: &str,
    fallback: Option<&str>,
) -> Option<String> {
    if let Some(store) = store {
        match store.get(key).await {
            Ok(Some(token)) if !token.trim().is_empty() => return Some(token.trim().to_string()),
            Ok(_) => tracing::debug!(key = %key, "no default token published"),
            Err(e) => tracing::warn!(key = %key, "default token lookup failed: {:#}", e),
        }
    }

    fallback.map(str::to_string)
}
