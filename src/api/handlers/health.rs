//! Health probe handlers.
//!
//! Three probe endpoints:
//! - `/live`: process liveness only (no dependency checks)
//! - `/ready`: database-aware readiness for orchestrators
//! - `/health`: database-aware status with detailed JSON payload, including
//!   the event-publisher delivery counters

use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use sqlx::{Connection, PgPool};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info_span, warn, Instrument};

use crate::{api::GIT_COMMIT_HASH, events::PublisherMetrics};

const HEALTH_DB_TIMEOUT_SECONDS: u64 = 2;

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
    events_delivered: u64,
    events_failed: u64,
}

/// Report process liveness without checking external dependencies.
pub async fn live() -> impl IntoResponse {
    StatusCode::OK
}

/// Report readiness based on database connectivity.
pub async fn ready(pool: Extension<PgPool>) -> impl IntoResponse {
    if database_is_healthy(&pool.0).await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Perform a detailed health check.
pub async fn health(
    method: Method,
    pool: Extension<PgPool>,
    metrics: Extension<Arc<PublisherMetrics>>,
) -> impl IntoResponse {
    let db_healthy = database_is_healthy(&pool.0).await;

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if db_healthy {
            "ok".to_string()
        } else {
            "error".to_string()
        },
        events_delivered: metrics.delivered(),
        events_failed: metrics.failed(),
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .map_err(|err| {
            debug!("Failed to parse X-App header: {}", err);
        })
        .unwrap_or_else(|()| HeaderMap::new());

    if db_healthy {
        (StatusCode::OK, headers, body)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}

/// Probe database connectivity used by `/ready` and `/health`.
async fn database_is_healthy(pool: &PgPool) -> bool {
    let acquire_span = info_span!(
        "db.acquire",
        db.system = "postgresql",
        db.operation = "ACQUIRE"
    );

    let probe = async {
        match pool.acquire().instrument(acquire_span).await {
            Ok(mut conn) => {
                let ping_span =
                    info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
                match conn.ping().instrument(ping_span).await {
                    Ok(()) => true,
                    Err(error) => {
                        error!("Failed to ping database: {}", error);
                        false
                    }
                }
            }
            Err(error) => {
                error!("Failed to acquire database connection: {}", error);
                false
            }
        }
    };

    match timeout(Duration::from_secs(HEALTH_DB_TIMEOUT_SECONDS), probe).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Database health check timed out");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};

    fn unreachable_pool() -> PgPool {
        let options = PgConnectOptions::new()
            .host("127.0.0.1")
            .port(1)
            .username("invalid")
            .database("invalid")
            .ssl_mode(PgSslMode::Disable);
        PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(200))
            .connect_lazy_with(options)
    }

    #[tokio::test]
    async fn live_is_always_ok() {
        let response = live().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_reports_unavailable_without_db() {
        let response = ready(Extension(unreachable_pool())).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn health_reports_unavailable_without_db() {
        let metrics = Arc::new(PublisherMetrics::default());
        let response = health(Method::GET, Extension(unreachable_pool()), Extension(metrics))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().contains_key("X-App"));
    }

    #[tokio::test]
    async fn options_health_has_an_empty_body() {
        let metrics = Arc::new(PublisherMetrics::default());
        let response = health(
            Method::OPTIONS,
            Extension(unreachable_pool()),
            Extension(metrics),
        )
        .await
        .into_response();

        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .expect("body readable");
        assert!(body.is_empty());
    }

    #[test]
    fn health_payload_serializes_counters() {
        let health = Health {
            commit: "unknown".to_string(),
            name: "aliro".to_string(),
            version: "0.1.0".to_string(),
            database: "ok".to_string(),
            events_delivered: 5,
            events_failed: 1,
        };
        let value = serde_json::to_value(health).expect("serializable");
        assert_eq!(value["events_delivered"], 5);
        assert_eq!(value["events_failed"], 1);
    }
}
