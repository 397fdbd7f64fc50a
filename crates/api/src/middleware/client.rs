//! Client metadata used by the verification pipeline.
//!
//! The client IP is the first entry of `x-forwarded-for` (set by the edge
//! proxy), falling back to `cf-connecting-ip`. Without either, rate limiting
//! is skipped and the fingerprint gets an empty network part.
//!
//! Both headers are taken at face value. Deploy behind a proxy that overwrites
//! `x-forwarded-for` (and strips client-sent `cf-connecting-ip`); otherwise a
//! client can rotate the header to dodge per-IP rate limiting.

use std::convert::Infallible;

use axum::{
    RequestPartsExt,
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::{TypedHeader, headers::UserAgent};

use crate::tokens::ClientSignals;

pub struct ClientMeta(pub ClientSignals);

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Best guess at the originating client address.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header_value(headers, "cf-connecting-ip"))
        .map(str::to_string)
}

impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .extract::<Option<TypedHeader<UserAgent>>>()
            .await
            .ok()
            .flatten()
            .map(|TypedHeader(ua)| ua.as_str().to_string());

        let accept_language =
            header_value(&parts.headers, header::ACCEPT_LANGUAGE.as_str()).map(str::to_string);

        Ok(ClientMeta(ClientSignals {
            ip: client_ip(&parts.headers),
            user_agent,
            accept_language,
        }))
    }
}
