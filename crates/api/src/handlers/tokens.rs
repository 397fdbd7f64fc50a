//! Redirect token endpoints.
//!
//! Tokens are short-lived ids that resolve to a destination URL once the
//! caller passes a human-verification challenge. See [`crate::tokens`] for
//! the lifecycle.
//!
//! ## Endpoints
//!
//! - POST /generate-token - Issue a token (JSON body, admin key required)
//! - GET /generate-token - Issue a token (query string, admin key required)
//! - POST /verify-token - Exchange a token and challenge proof for its URL
//! - GET /get-default-token - Token currently published as default
//!
//! An empty body reads as `{}`. Numeric fields also accept numeric text, and
//! a body or query string that still doesn't fit the payload is a 400 with
//! the parser's message. Every error response is JSON.

use axum::{
    Json, Router,
    body::Bytes,
    debug_handler,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use garde::Validate;
use serde::de::DeserializeOwned;
use shared::api::{
    DefaultTokenResponse, IssueTokenPayload, IssueTokenResponse, VerifyTokenPayload,
    VerifyTokenResponse,
};

use crate::{
    error::AppError,
    middleware::{admin::AdminAuth, client::ClientMeta},
    state::AppState,
    tokens::{IssueRequest, TokenError, VerifyRequest, read_default_token},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate-token", get(issue_from_query).post(issue_from_body))
        .route("/verify-token", post(verify_token))
        .route("/get-default-token", get(get_default_token))
}

fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.trim_ascii().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!("rejected request body: {}", e);
        AppError::Validation(format!("invalid request body: {}", e))
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[debug_handler]
async fn issue_from_body(
    _admin: AdminAuth,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    issue(&state, parse_body(&body)?).await
}

#[debug_handler]
async fn issue_from_query(
    _admin: AdminAuth,
    State(state): State<AppState>,
    query: Result<Query<IssueTokenPayload>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(payload) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    issue(&state, payload).await
}

async fn issue(
    state: &AppState,
    payload: IssueTokenPayload,
) -> Result<Json<IssueTokenResponse>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    // Bad input is reported before configuration problems.
    let redirect_url =
        non_empty(payload.url).ok_or(AppError::Token(TokenError::MissingDestination))?;

    let issued = state
        .issuer()?
        .issue(
            IssueRequest {
                redirect_url,
                ttl_secs: payload.ttl,
                max_uses: payload.max_uses,
                publish_default: payload.set_default,
            },
            Utc::now(),
        )
        .await
        .map_err(AppError::Token)?;

    Ok(Json(IssueTokenResponse {
        token: issued.token,
        expires_in: issued.ttl_secs,
        warnings: issued.warnings,
    }))
}

#[debug_handler]
async fn verify_token(
    State(state): State<AppState>,
    ClientMeta(client): ClientMeta,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payload: VerifyTokenPayload = parse_body(&body)?;

    let token = non_empty(payload.token)
        .ok_or_else(|| AppError::Validation("missing token".to_string()))?;
    let proof = non_empty(payload.challenge_response)
        .ok_or_else(|| AppError::Validation("missing challenge response".to_string()))?;

    let record = state
        .verifier()?
        .verify(&VerifyRequest { token, proof, client }, Utc::now())
        .await
        .map_err(AppError::Token)?;

    Ok(Json(VerifyTokenResponse {
        ok: true,
        url: record.redirect_url,
    }))
}

#[debug_handler]
async fn get_default_token(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let token = read_default_token(
        state.store.as_deref(),
        &state.config.default_token_key,
        state.config.fallback_token(),
    )
    .await
    .ok_or(AppError::External(StatusCode::NOT_FOUND, "no-default-token"))?;

    Ok(Json(DefaultTokenResponse { token }))
}
