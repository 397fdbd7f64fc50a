use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shared::api::ErrorResponse;

use crate::tokens::TokenError;

#[derive(Debug)]
pub enum AppError {
    /// Internal errors - logged but return generic 500 to user
    Internal(anyhow::Error),
    /// User-facing errors - message is safe to show
    External(StatusCode, &'static str),
    /// Validation errors - safe to show
    Validation(String),
    /// Missing or wrong admin credential
    Unauthorized,
    /// Required configuration is absent
    Misconfigured(&'static str),
    /// Token issuance / verification outcome
    Token(TokenError),
}

fn error_body(status: StatusCode, error: impl Into<String>) -> Response {
    error_body_with_detail(status, error, None)
}

fn error_body_with_detail(
    status: StatusCode,
    error: impl Into<String>,
    detail: Option<serde_json::Value>,
) -> Response {
    let body = ErrorResponse {
        ok: false,
        error: error.into(),
        detail,
    };
    (status, Json(body)).into_response()
}

fn internal(err: anyhow::Error) -> Response {
    tracing::error!("internal error: {:?}", err);
    sentry::capture_error(err.as_ref() as &(dyn std::error::Error + Send + Sync + 'static));

    error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Internal(err) => internal(err),
            AppError::External(status, msg) => error_body(status, msg),
            AppError::Validation(msg) => error_body(StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized => error_body(StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Misconfigured(what) => {
                tracing::error!("server misconfigured: {}", what);
                error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("server misconfigured: {}", what),
                )
            }
            AppError::Token(err) => err.into_response(),
        }
    }
}

impl IntoResponse for TokenError {
    fn into_response(self) -> Response {
        let status = match &self {
            TokenError::MissingDestination => StatusCode::BAD_REQUEST,
            TokenError::ChallengeFailed(_) => StatusCode::UNAUTHORIZED,
            TokenError::NotFound => StatusCode::NOT_FOUND,
            TokenError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            TokenError::FingerprintMismatch | TokenError::UsageExhausted => StatusCode::FORBIDDEN,
            TokenError::Upstream(_) => StatusCode::BAD_GATEWAY,
            TokenError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match self {
            TokenError::ChallengeFailed(detail) => {
                error_body_with_detail(status, "challenge failed", Some(detail))
            }
            TokenError::Upstream(err) => {
                tracing::error!("upstream failure: {:?}", err);
                error_body(status, "upstream failure")
            }
            TokenError::Internal(err) => internal(err),
            other => error_body(status, other.to_string()),
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}
