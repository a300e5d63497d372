//! HTTP surface: token grants, introspection and health probes.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request},
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;

use crate::{
    auth::{Authenticator, CredentialVerifier, RetryPolicy, SecretHasher},
    cli::globals::GlobalArgs,
    events::{EventPublisher, RedisStreamSink},
    store::PgCredentialStore,
    token::{TokenIssuer, TokenValidator},
};

pub mod handlers;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

/// Wire everything together and serve until interrupted.
///
/// # Errors
/// Returns an error if the database or event stream cannot be reached, the
/// signing-key material is unusable, or the listener fails to bind.
pub async fn new(port: u16, dsn: String, globals: &GlobalArgs) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let keyring = Arc::new(globals.keyring()?);

    let store = Arc::new(PgCredentialStore::new(pool.clone()));
    let verifier = CredentialVerifier::new(store, SecretHasher::new())
        .context("Failed to initialize credential verifier")?;

    let issuer = TokenIssuer::new(Arc::clone(&keyring), globals.token_issuer.clone());
    let validator = Arc::new(TokenValidator::new(
        keyring,
        globals.token_issuer.clone(),
        globals.token_leeway,
    ));

    let sink = RedisStreamSink::connect(&globals.redis_url, globals.events_stream.clone())
        .await
        .context("Failed to connect to event stream")?;
    let publisher = EventPublisher::new(Arc::new(sink), globals.publish_timeout);
    let metrics = publisher.metrics();

    let authenticator = Arc::new(Authenticator::new(
        verifier,
        issuer,
        publisher,
        globals.token_ttl,
        RetryPolicy::default(),
    ));

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any);

    let app = Router::new()
        .route("/token", post(handlers::token))
        .route("/introspect", post(handlers::introspect))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(authenticator))
                .layer(Extension(validator)),
        )
        .route("/live", get(handlers::live))
        .route("/ready", get(handlers::ready))
        .route("/health", get(handlers::health).options(handlers::health))
        .layer(Extension(pool))
        .layer(Extension(metrics));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, ?headers, request_id)
}
