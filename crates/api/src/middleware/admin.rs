//! Admin credential check for token issuance.
//!
//! Usage: Add `AdminAuth` as an extractor parameter to require the admin key.
//! The key is read from the `x-admin-key` header, falling back to the
//! `admin_key` query parameter for link-style GET requests.
//!
//! ```ignore
//! async fn my_handler(_admin: AdminAuth, ...) -> ... {
//!     // only reached with a valid admin key
//! }
//! ```

use axum::{
    RequestPartsExt,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::{error::AppError, state::AppState};

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Proof that the request carried the configured admin key.
pub struct AdminAuth;

#[derive(Deserialize)]
struct AdminKeyQuery {
    admin_key: Option<String>,
}

fn matches_admin_key(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let from_header = parts
            .headers
            .get(ADMIN_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let provided = match from_header {
            Some(key) => Some(key),
            None => parts
                .extract::<Query<AdminKeyQuery>>()
                .await
                .ok()
                .and_then(|Query(q)| q.admin_key),
        };

        match provided {
            Some(key) if !key.is_empty() && matches_admin_key(&key, &state.config.admin_key) => {
                Ok(AdminAuth)
            }
            Some(_) => {
                tracing::warn!("issue rejected: wrong admin key");
                Err(AppError::Unauthorized)
            }
            None => Err(AppError::Unauthorized),
        }
    }
}
