//! Postgres-backed credential store.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{info_span, Instrument};

use super::{ClientCredential, CredentialStore, StoreError, StoreFuture};

#[derive(Clone, Debug)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CredentialStore for PgCredentialStore {
    fn find_by_id(&self, client_id: i64) -> StoreFuture<'_, ClientCredential> {
        Box::pin(async move {
            let query = "SELECT client_id, secret_hash, active, created_at, last_used_at \
                         FROM client_credentials WHERE client_id = $1";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "SELECT",
                db.statement = query
            );

            let row = sqlx::query(query)
                .bind(client_id)
                .fetch_optional(&self.pool)
                .instrument(span)
                .await?;

            let Some(row) = row else {
                return Err(StoreError::NotFound);
            };

            Ok(ClientCredential {
                client_id: row.try_get("client_id")?,
                secret_hash: row.try_get("secret_hash")?,
                active: row.try_get("active")?,
                created_at: row.try_get("created_at")?,
                last_used_at: row.try_get("last_used_at")?,
            })
        })
    }

    fn touch(&self, client_id: i64, at: DateTime<Utc>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            // GREATEST ignores the NULL on first use and keeps last_used_at
            // from moving backwards when concurrent logins race.
            let query = "UPDATE client_credentials \
                         SET last_used_at = GREATEST(last_used_at, $2) \
                         WHERE client_id = $1";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "UPDATE",
                db.statement = query
            );

            let result = sqlx::query(query)
                .bind(client_id)
                .bind(at)
                .execute(&self.pool)
                .instrument(span)
                .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound);
            }

            Ok(())
        })
    }

    fn create(&self, credential: ClientCredential) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let query = "INSERT INTO client_credentials \
                         (client_id, secret_hash, active, created_at, last_used_at) \
                         VALUES ($1, $2, $3, $4, $5)";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "INSERT",
                db.statement = query
            );

            sqlx::query(query)
                .bind(credential.client_id)
                .bind(&credential.secret_hash)
                .bind(credential.active)
                .bind(credential.created_at)
                .bind(credential.last_used_at)
                .execute(&self.pool)
                .instrument(span)
                .await?;

            Ok(())
        })
    }
}
