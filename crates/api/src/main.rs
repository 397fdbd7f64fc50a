mod config;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod state;
mod stores;
#[cfg(test)]
mod test_utils;
mod tokens;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{Router, http};
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::Config,
    services::{ChallengeVerifier, TurnstileVerifier},
    state::AppState,
    stores::{KvStore, RateLimiter, RedisRateLimiter, RedisStore},
    tokens::FingerprintBinder,
};

#[derive(Parser)]
#[command(name = "hopgate")]
#[command(about = "Challenge-guarded redirect token server")]
struct Args {
    /// Validate configuration and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider before any TLS operations
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let args = Args::parse();
    let config = envy::prefixed("HOPGATE_").from_env::<Config>()?;
    config.validate()?;

    if args.check_config {
        println!("configuration ok");
        return Ok(());
    }

    // Initialize Sentry for error tracking (guard must stay alive)
    let _sentry_guard = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(config.env.clone().into()),
                ..Default::default()
            },
        ))
    });

    // Set up tracing: JSON in production, human-readable otherwise
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }

    let (store, rate_limiter) = match config.redis_url.as_deref() {
        Some(url) => {
            let redis = redis::Client::open(url).context("invalid redis url")?;
            let store: Arc<dyn KvStore> = Arc::new(RedisStore::new(redis.clone()));
            let limiter: Arc<dyn RateLimiter> = Arc::new(RedisRateLimiter::new(redis));
            (Some(store), Some(limiter))
        }
        None => {
            tracing::warn!("no redis url configured; issue and verify will fail");
            (None, None)
        }
    };

    let challenge = match config.challenge_secret.as_deref() {
        Some(secret) => {
            let verifier: Arc<dyn ChallengeVerifier> = Arc::new(TurnstileVerifier::new(
                config.challenge_verify_url.clone(),
                secret,
                Duration::from_secs(config.challenge_timeout_secs),
            )?);
            Some(verifier)
        }
        None => {
            tracing::warn!("no challenge secret configured; verify will fail");
            None
        }
    };

    let fingerprint = config
        .fingerprint_secret
        .as_deref()
        .map(FingerprintBinder::new)
        .transpose()?;
    if fingerprint.is_some() {
        tracing::info!("fingerprint binding enabled");
    }

    let state = AppState {
        config: config.clone(),
        store,
        rate_limiter,
        challenge,
        fingerprint,
    };

    // Request ID header name
    let x_request_id = http::HeaderName::from_static("x-request-id");

    let app = Router::new()
        .nest("/health", handlers::health::router())
        .merge(handlers::tokens::router())
        .with_state(state)
        // Request ID: generate UUID, include in logs, return in response
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(64 * 1024));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");

    Ok(())
}

/// Per-request span. Only the path is recorded; the query string can carry
/// the admin key.
fn request_span(request: &http::Request<axum::body::Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "http",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
