//! Access-token minting.

use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, Header};
use std::{sync::Arc, time::Duration};
use tracing::instrument;
use ulid::Ulid;

use super::{claims::AccessTokenClaims, keyring::KeyRing};
use crate::auth::error::AuthError;

/// A freshly minted token together with its decoded claims.
#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub token: String,
    pub claims: AccessTokenClaims,
}

/// Mints signed, time-bounded access tokens with the ring's current key.
pub struct TokenIssuer {
    keyring: Arc<KeyRing>,
    issuer: String,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(keyring: Arc<KeyRing>, issuer: impl Into<String>) -> Self {
        Self {
            keyring,
            issuer: issuer.into(),
        }
    }

    /// Issue a token for a verified client.
    ///
    /// # Errors
    /// Returns an error if the ttl is below one second or signing fails.
    #[instrument(skip(self))]
    pub fn issue(&self, client_id: i64, ttl: Duration) -> Result<IssuedToken, AuthError> {
        self.issue_at(client_id, ttl, Utc::now())
    }

    fn issue_at(
        &self,
        client_id: i64,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let ttl_seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        if ttl_seconds < 1 {
            return Err(AuthError::ServiceUnavailable(
                "token ttl must be at least one second".to_string(),
            ));
        }

        let iat = now.timestamp();
        let claims = AccessTokenClaims {
            iss: self.issuer.clone(),
            sub: client_id.to_string(),
            jti: Ulid::new().to_string(),
            iat,
            exp: iat.saturating_add(ttl_seconds),
        };

        let key = self.keyring.signing_key();
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(key.kid.clone());

        let token = encode(&header, &claims, &key.encoding)
            .map_err(|err| AuthError::ServiceUnavailable(format!("token signing failed: {err}")))?;

        Ok(IssuedToken { token, claims })
    }
}
