//! The authentication flow.
//!
//! One attempt walks `Received -> Verifying -> {Issuing -> Published(success),
//! Rejected -> Published(failure)}`. Credential outcomes are final on the
//! first try; only infrastructure failures (store outage, signing failure)
//! are retried, bounded, with jittered exponential backoff. Event
//! publication sits outside the happy path entirely: it is bounded by the
//! publisher's timeout and its failures never fail the request.

use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{instrument, warn};

use super::{
    error::AuthError,
    verifier::{CredentialVerifier, VerifiedClient},
};
use crate::{
    events::{AuthEvent, EventPublisher},
    token::{issuer::IssuedToken, TokenIssuer},
};

/// Bounded retry with exponential backoff for transient infra failures.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
        }
    }
}

/// What a successful authentication hands back to the caller.
#[derive(Clone, Debug)]
pub struct TokenGrant {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

/// Composes verifier, issuer and publisher into the request-handling flow.
pub struct Authenticator {
    verifier: CredentialVerifier,
    issuer: TokenIssuer,
    publisher: EventPublisher,
    token_ttl: Duration,
    retry: RetryPolicy,
}

impl Authenticator {
    #[must_use]
    pub fn new(
        verifier: CredentialVerifier,
        issuer: TokenIssuer,
        publisher: EventPublisher,
        token_ttl: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            verifier,
            issuer,
            publisher,
            token_ttl,
            retry,
        }
    }

    /// Authenticate a credential pair and mint an access token.
    ///
    /// # Errors
    /// Credential failures come back as their internal variant (callers
    /// collapse them before anything leaves the service); exhausted infra
    /// retries come back as `ServiceUnavailable`.
    #[instrument(skip(self, secret))]
    pub async fn authenticate(
        &self,
        client_id: i64,
        secret: &str,
    ) -> Result<TokenGrant, AuthError> {
        let verified = match self.verify_with_retry(client_id, secret).await {
            Ok(verified) => verified,
            Err(err) => {
                self.publisher
                    .publish(AuthEvent::failure(client_id, err.reason()))
                    .await;
                return Err(err);
            }
        };

        let issued = match self.issue_with_retry(verified.client_id).await {
            Ok(issued) => issued,
            Err(err) => {
                self.publisher
                    .publish(AuthEvent::failure(client_id, err.reason()))
                    .await;
                return Err(err);
            }
        };

        self.publisher.publish(AuthEvent::success(client_id)).await;

        Ok(TokenGrant {
            access_token: issued.token,
            token_type: "Bearer",
            expires_in: issued.claims.lifetime_seconds(),
        })
    }

    /// A wrong secret is never retried; only a store outage is.
    async fn verify_with_retry(
        &self,
        client_id: i64,
        secret: &str,
    ) -> Result<VerifiedClient, AuthError> {
        let mut attempt = 0;
        loop {
            match self.verifier.verify(client_id, secret).await {
                Err(AuthError::ServiceUnavailable(message))
                    if attempt + 1 < self.retry.max_attempts =>
                {
                    attempt += 1;
                    warn!("credential store unavailable, retrying (attempt {attempt}): {message}");
                    sleep(self.backoff_delay(attempt)).await;
                }
                result => return result,
            }
        }
    }

    async fn issue_with_retry(&self, client_id: i64) -> Result<IssuedToken, AuthError> {
        let mut attempt = 0;
        loop {
            match self.issuer.issue(client_id, self.token_ttl) {
                Err(AuthError::ServiceUnavailable(message))
                    if attempt + 1 < self.retry.max_attempts =>
                {
                    attempt += 1;
                    warn!("token issuance failed, retrying (attempt {attempt}): {message}");
                    sleep(self.backoff_delay(attempt)).await;
                }
                result => return result,
            }
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(8);
        let base = self.retry.base_delay.saturating_mul(1 << exponent);
        let jitter_cap = self.retry.base_delay.as_millis() as u64 / 2;
        let jitter = rand::thread_rng().gen_range(0..=jitter_cap);
        base + Duration::from_millis(jitter)
    }
}
