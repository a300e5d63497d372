//! Token introspection for internal callers.
//!
//! Rejection reasons are typed for internal consumers (gateways, sibling
//! services); end clients never see this endpoint, so surfacing the reason
//! here does not leak anything across the service boundary.

use axum::{extract::Extension, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::{auth::AuthError, token::TokenValidator};

#[derive(Deserialize)]
pub struct IntrospectRequest {
    token: String,
}

#[derive(Serialize, Debug)]
pub struct Introspection {
    active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    jti: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
}

type IntrospectionResponse = Result<(StatusCode, Json<Introspection>), (StatusCode, String)>;

#[instrument(skip_all)]
pub async fn introspect(
    Extension(validator): Extension<Arc<TokenValidator>>,
    payload: Option<Json<IntrospectRequest>>,
) -> IntrospectionResponse {
    let Some(Json(request)) = payload else {
        return Err((StatusCode::BAD_REQUEST, "Missing payload".to_string()));
    };

    match validator.validate(&request.token) {
        Ok(claims) => Ok((
            StatusCode::OK,
            Json(Introspection {
                active: true,
                sub: Some(claims.sub),
                jti: Some(claims.jti),
                iat: Some(claims.iat),
                exp: Some(claims.exp),
                reason: None,
            }),
        )),
        Err(err) => {
            debug!("token rejected: {err}");
            Ok((
                StatusCode::OK,
                Json(Introspection {
                    active: false,
                    sub: None,
                    jti: None,
                    iat: None,
                    exp: None,
                    reason: Some(rejection_reason(&err)),
                }),
            ))
        }
    }
}

fn rejection_reason(err: &AuthError) -> &'static str {
    match err {
        AuthError::MalformedToken(_) => "malformed",
        AuthError::Expired => "expired",
        // Anything else means the token is not one of ours.
        _ => "invalid_signature",
    }
}
