//! Authentication error taxonomy.
//!
//! Verification-detail variants (`CredentialNotFound`, `InactiveCredential`,
//! `SecretMismatch`) exist for internal flow control and event reporting only;
//! the HTTP boundary collapses all of them into one generic failure so callers
//! cannot enumerate valid client identifiers.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential record for the presented client id. Internal only.
    #[error("client credential not found")]
    CredentialNotFound,

    /// The credential exists but has been deactivated. Internal only.
    #[error("client credential is inactive")]
    InactiveCredential,

    /// The presented secret does not match the stored digest. Internal only.
    #[error("client secret mismatch")]
    SecretMismatch,

    /// The token could not be parsed at all.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The token parsed but no configured key verifies its signature,
    /// or a verified claim does not match what this service mints.
    #[error("invalid token signature")]
    InvalidSignature,

    /// The token was valid once but its lifetime has passed.
    #[error("token expired")]
    Expired,

    /// Transient infrastructure failure, eligible for bounded retry.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// True for the verification outcomes that collapse into the single
    /// generic authentication-failure response.
    #[must_use]
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            AuthError::CredentialNotFound
                | AuthError::InactiveCredential
                | AuthError::SecretMismatch
        )
    }

    /// Stable label used as the failure reason on published auth events.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::CredentialNotFound => "not_found",
            AuthError::InactiveCredential => "inactive",
            AuthError::SecretMismatch => "secret_mismatch",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Expired => "expired",
            AuthError::ServiceUnavailable(_) => "service_unavailable",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AuthError::CredentialNotFound,
            StoreError::Duplicate => {
                AuthError::ServiceUnavailable("credential already exists".to_string())
            }
            StoreError::Unavailable(message) => AuthError::ServiceUnavailable(message),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::InvalidIssuer => AuthError::InvalidSignature,
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::MalformedToken(err.to_string()),
        }
    }
}
