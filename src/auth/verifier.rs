//! Credential verification with anti-enumeration timing discipline.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::{error::AuthError, hasher::SecretHasher};
use crate::store::{CredentialStore, StoreError};

/// Placeholder secret hashed once at construction. When a lookup misses, the
/// presented secret is still compared against this digest so a missing id
/// costs the same wall-clock time as a wrong secret on an existing id.
const FALLBACK_SECRET: &str = "aliro-fallback-credential";

/// Outcome of a successful verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifiedClient {
    pub client_id: i64,
}

/// Orchestrates lookup, hash comparison and active-state check.
///
/// All three failure modes (unknown id, inactive credential, wrong secret)
/// must stay indistinguishable to the caller, in both the returned error
/// shape (collapsed at the boundary) and timing: the hash comparison always
/// runs before any short-circuit, and the active flag is only consulted
/// afterwards.
pub struct CredentialVerifier {
    store: Arc<dyn CredentialStore>,
    hasher: SecretHasher,
    fallback_digest: String,
}

impl CredentialVerifier {
    /// # Errors
    /// Returns an error if the fallback digest cannot be computed.
    pub fn new(store: Arc<dyn CredentialStore>, hasher: SecretHasher) -> Result<Self, AuthError> {
        let fallback_digest = hasher.hash(FALLBACK_SECRET)?;
        Ok(Self {
            store,
            hasher,
            fallback_digest,
        })
    }

    /// Verify a client id / secret pair.
    ///
    /// On success the store's `last_used_at` is touched best-effort; a failed
    /// touch is logged and never fails the verification.
    ///
    /// # Errors
    /// Returns the internal failure variant; callers collapse credential
    /// failures into one generic error before anything leaves the service.
    #[instrument(skip(self, secret))]
    pub async fn verify(&self, client_id: i64, secret: &str) -> Result<VerifiedClient, AuthError> {
        let credential = match self.store.find_by_id(client_id).await {
            Ok(credential) => credential,
            Err(StoreError::NotFound) => {
                // Burn the same comparison a present credential would cost.
                let _ = self.hasher.verify(secret, &self.fallback_digest);
                debug!("unknown client id");
                return Err(AuthError::CredentialNotFound);
            }
            Err(err) => return Err(err.into()),
        };

        // Hash first; the active flag must not shortcut the comparison.
        let secret_matches = self.hasher.verify(secret, &credential.secret_hash);

        if !credential.active {
            debug!("inactive credential");
            return Err(AuthError::InactiveCredential);
        }

        if !secret_matches {
            debug!("secret mismatch");
            return Err(AuthError::SecretMismatch);
        }

        if let Err(err) = self.store.touch(client_id, Utc::now()).await {
            warn!("failed to update last_used_at: {err}");
        }

        Ok(VerifiedClient { client_id })
    }
}
