//! Credential store contract and implementations.
//!
//! The store is an external collaborator from the point of view of the
//! authentication flow: it only exposes lookup by client id, a best-effort
//! `last_used_at` update, and the provisioning path used by seeding tooling.
//! The Postgres implementation is the production backend; the in-memory
//! implementation backs tests.

use chrono::{DateTime, Utc};
use std::{future::Future, pin::Pin};
use thiserror::Error;

use crate::auth::{error::AuthError, hasher::SecretHasher};

pub mod memory;
pub mod postgres;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// A machine client's stored credential record.
///
/// `secret_hash` is a PHC-format digest; the plaintext secret is hashed
/// before it ever reaches a store implementation.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientCredential {
    pub client_id: i64,
    pub secret_hash: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential not found")]
    NotFound,

    #[error("credential already exists")]
    Duplicate,

    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err)
                if db_err.code().is_some_and(|code| code.as_ref() == "23505") =>
            {
                StoreError::Duplicate
            }
            err => StoreError::Unavailable(err.to_string()),
        }
    }
}

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Lookup and mutation surface required by the authentication flow.
///
/// `touch` must be safe under concurrent updates to the same record;
/// implementations resolve races last-write-wins while keeping
/// `last_used_at` monotonically non-decreasing.
pub trait CredentialStore: Send + Sync {
    fn find_by_id(&self, client_id: i64) -> StoreFuture<'_, ClientCredential>;

    fn touch(&self, client_id: i64, at: DateTime<Utc>) -> StoreFuture<'_, ()>;

    fn create(&self, credential: ClientCredential) -> StoreFuture<'_, ()>;
}

/// Create a credential record from a plaintext secret.
///
/// The secret is hashed before it is handed to the store; callers never
/// persist plaintext. Used by seeding/provisioning tooling and tests.
///
/// # Errors
/// Returns an error if hashing fails or the store rejects the record.
pub async fn provision(
    store: &dyn CredentialStore,
    hasher: &SecretHasher,
    client_id: i64,
    secret: &str,
    active: bool,
) -> Result<ClientCredential, AuthError> {
    let credential = ClientCredential {
        client_id,
        secret_hash: hasher.hash(secret)?,
        active,
        created_at: Utc::now(),
        last_used_at: None,
    };

    store.create(credential.clone()).await?;

    Ok(credential)
}
