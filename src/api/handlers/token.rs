//! Token-grant endpoint.

use axum::{
    extract::Extension,
    http::{header::CACHE_CONTROL, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument};

use crate::auth::Authenticator;

/// Generic failure message for every credential problem. Deliberately the
/// same for unknown ids, inactive credentials and wrong secrets, so the
/// endpoint cannot be used to enumerate valid client identifiers.
const INVALID_CREDENTIALS: &str = "Invalid client credentials";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    client_id: i64,
    client_secret: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: u64,
}

type GrantResponse = Result<(StatusCode, HeaderMap, Json<TokenResponse>), (StatusCode, String)>;

#[instrument(skip_all)]
pub async fn token(
    Extension(authenticator): Extension<Arc<Authenticator>>,
    payload: Option<Json<TokenRequest>>,
) -> GrantResponse {
    let Some(Json(request)) = payload else {
        return Err((StatusCode::BAD_REQUEST, "Missing payload".to_string()));
    };

    match authenticator
        .authenticate(request.client_id, &request.client_secret)
        .await
    {
        Ok(grant) => {
            let mut response_headers = HeaderMap::new();
            response_headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
            Ok((
                StatusCode::OK,
                response_headers,
                Json(TokenResponse {
                    access_token: grant.access_token,
                    token_type: grant.token_type.to_string(),
                    expires_in: grant.expires_in,
                }),
            ))
        }
        Err(err) if err.is_credential_failure() => {
            debug!("authentication rejected: {err}");
            Err((StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS.to_string()))
        }
        Err(err) => {
            error!("authentication unavailable: {err}");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{CredentialVerifier, RetryPolicy, SecretHasher},
        events::{AuthEvent, EventPublisher, EventSink, SinkFuture},
        store::{provision, MemoryCredentialStore},
        token::{KeyRing, TokenIssuer},
    };
    use argon2::Params;
    use std::time::Duration;

    struct NullSink;

    impl EventSink for NullSink {
        fn publish<'a>(&'a self, _event: &'a AuthEvent) -> SinkFuture<'a> {
            Box::pin(async move { Ok(()) })
        }
    }

    async fn test_authenticator() -> Arc<Authenticator> {
        let hasher =
            SecretHasher::with_params(Params::new(8, 1, 1, None).expect("valid test params"));
        let store = MemoryCredentialStore::new();
        provision(&store, &hasher, 123_456, "secret123", true)
            .await
            .expect("seed credential");

        let verifier = CredentialVerifier::new(Arc::new(store), hasher)
            .expect("verifier construction");
        let keyring = Arc::new(KeyRing::new("v1", &[0x42; 32]).expect("ring construction"));
        let issuer = TokenIssuer::new(keyring, "https://aliro.dev");
        let publisher = EventPublisher::new(Arc::new(NullSink), Duration::from_millis(50));

        Arc::new(Authenticator::new(
            verifier,
            issuer,
            publisher,
            Duration::from_secs(3600),
            RetryPolicy::default(),
        ))
    }

    #[tokio::test]
    async fn grant_for_valid_credentials() {
        let authenticator = test_authenticator().await;
        let payload = Some(Json(TokenRequest {
            client_id: 123_456,
            client_secret: "secret123".to_string(),
        }));

        let (status, headers, Json(body)) = token(Extension(authenticator), payload)
            .await
            .expect("grant issued");

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            headers.get(CACHE_CONTROL).and_then(|value| value.to_str().ok()),
            Some("no-store")
        );
        assert_eq!(body.token_type, "Bearer");
        assert_eq!(body.expires_in, 3600);
        assert!(!body.access_token.is_empty());
    }

    #[tokio::test]
    async fn wrong_secret_gets_the_generic_rejection() {
        let authenticator = test_authenticator().await;
        let payload = Some(Json(TokenRequest {
            client_id: 123_456,
            client_secret: "wrongpass".to_string(),
        }));

        let err = token(Extension(authenticator), payload).await.expect_err("rejected");
        assert_eq!(err, (StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS.to_string()));
    }

    #[tokio::test]
    async fn unknown_client_gets_the_same_rejection() {
        let authenticator = test_authenticator().await;
        let payload = Some(Json(TokenRequest {
            client_id: 999_999,
            client_secret: "anything".to_string(),
        }));

        let err = token(Extension(authenticator), payload).await.expect_err("rejected");
        assert_eq!(err, (StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS.to_string()));
    }

    #[tokio::test]
    async fn missing_payload_is_a_bad_request() {
        let authenticator = test_authenticator().await;

        let err = token(Extension(authenticator), None).await.expect_err("rejected");
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn request_parses_camel_case() {
        let request: TokenRequest =
            serde_json::from_str(r#"{"clientId": 123456, "clientSecret": "secret123"}"#)
                .expect("parsable request");
        assert_eq!(request.client_id, 123_456);
        assert_eq!(request.client_secret, "secret123");
    }

    #[test]
    fn response_serializes_camel_case() {
        let response = TokenResponse {
            access_token: "jwt".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
        };
        let value = serde_json::to_value(response).expect("serializable response");
        assert_eq!(
            value,
            serde_json::json!({
                "accessToken": "jwt",
                "tokenType": "Bearer",
                "expiresIn": 3600
            })
        );
    }
}
