//! Access-token claims.

use serde::{Deserialize, Serialize};

/// Claims minted into every access token.
///
/// `jti` is a ULID so each token stays individually addressable for future
/// revocation hooks. Timestamps are unix seconds, the way the signing
/// library expects them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub iss: String,
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl AccessTokenClaims {
    /// Parse the subject back into a client id, if it is one.
    #[must_use]
    pub fn client_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }

    /// Remaining lifetime in seconds at issuance.
    #[must_use]
    pub fn lifetime_seconds(&self) -> u64 {
        u64::try_from(self.exp.saturating_sub(self.iat)).unwrap_or(0)
    }
}
