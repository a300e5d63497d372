//! Access-token validation.

use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use std::{sync::Arc, time::Duration};
use tracing::instrument;

use super::{claims::AccessTokenClaims, keyring::KeyRing};
use crate::auth::error::AuthError;

/// Verifies structure, signature and lifetime of presented tokens.
///
/// Signature checks run against the ring's current key first and fall back
/// to the grace-period previous key, so validators mid-rotation keep
/// accepting recently issued tokens. Expiry checks apply a configurable
/// leeway to absorb clock skew between hosts.
pub struct TokenValidator {
    keyring: Arc<KeyRing>,
    issuer: String,
    leeway: Duration,
}

impl TokenValidator {
    #[must_use]
    pub fn new(keyring: Arc<KeyRing>, issuer: impl Into<String>, leeway: Duration) -> Self {
        Self {
            keyring,
            issuer: issuer.into(),
            leeway,
        }
    }

    /// Validate a bearer token and return its claims.
    ///
    /// # Errors
    /// `MalformedToken` if the token does not parse, `InvalidSignature` if no
    /// configured key verifies it (or a verified claim is not ours), and
    /// `Expired` once the lifetime (plus leeway) has passed.
    #[instrument(skip_all)]
    pub fn validate(&self, token: &str) -> Result<AccessTokenClaims, AuthError> {
        let header =
            decode_header(token).map_err(|err| AuthError::MalformedToken(err.to_string()))?;
        if header.alg != Algorithm::HS256 {
            return Err(AuthError::InvalidSignature);
        }

        let validation = self.validation();
        let (current, previous) = self.keyring.verification_keys();

        match self.decode_with(token, &current.decoding, &validation) {
            Err(AuthError::InvalidSignature) => match previous {
                Some(previous) => self.decode_with(token, &previous.decoding, &validation),
                None => Err(AuthError::InvalidSignature),
            },
            result => result,
        }
    }

    fn decode_with(
        &self,
        token: &str,
        key: &DecodingKey,
        validation: &Validation,
    ) -> Result<AccessTokenClaims, AuthError> {
        match decode::<AccessTokenClaims>(token, key, validation) {
            Ok(data) => Ok(data.claims),
            Err(err) if matches!(err.kind(), ErrorKind::InvalidSignature) => {
                Err(AuthError::InvalidSignature)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway.as_secs();
        validation.validate_aud = false;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::issuer::TokenIssuer;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const KEY_A: &[u8] = &[0xa1; 32];
    const KEY_B: &[u8] = &[0x1a; 32];
    const ISSUER: &str = "https://aliro.dev";

    fn ring() -> Arc<KeyRing> {
        Arc::new(KeyRing::new("v1", KEY_A).expect("ring construction"))
    }

    fn validator(keyring: Arc<KeyRing>, leeway: Duration) -> TokenValidator {
        TokenValidator::new(keyring, ISSUER, leeway)
    }

    fn signed_claims(claims: &AccessTokenClaims, key: &[u8]) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("v1".to_string());
        encode(&header, claims, &EncodingKey::from_secret(key)).expect("encodable claims")
    }

    fn claims_with_lifetime(iat_offset: i64, exp_offset: i64) -> AccessTokenClaims {
        let now = Utc::now().timestamp();
        AccessTokenClaims {
            iss: ISSUER.to_string(),
            sub: "123456".to_string(),
            jti: "01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string(),
            iat: now + iat_offset,
            exp: now + exp_offset,
        }
    }

    #[test]
    fn round_trip_returns_the_subject() {
        let keyring = ring();
        let issuer = TokenIssuer::new(keyring.clone(), ISSUER);
        let validator = validator(keyring, Duration::from_secs(5));

        let issued = issuer.issue(123_456, Duration::from_secs(3600)).expect("issuance");
        let claims = validator.validate(&issued.token).expect("validation");

        assert_eq!(claims.sub, "123456");
        assert_eq!(claims.client_id(), Some(123_456));
        assert_eq!(claims.jti, issued.claims.jti);
    }

    #[test]
    fn garbage_is_malformed() {
        let validator = validator(ring(), Duration::ZERO);
        for token in ["", "not-a-jwt", "a.b", "a.b.c.d", "!!!.!!!.!!!"] {
            let result = validator.validate(token);
            assert!(
                matches!(result, Err(AuthError::MalformedToken(_))),
                "expected MalformedToken for {token:?}, got {result:?}"
            );
        }
    }

    #[test]
    fn foreign_key_is_invalid_signature() {
        let validator = validator(ring(), Duration::ZERO);
        let token = signed_claims(&claims_with_lifetime(0, 3600), KEY_B);

        let result = validator.validate(&token);
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let validator = validator(ring(), Duration::ZERO);
        let token = signed_claims(&claims_with_lifetime(-120, -60), KEY_A);

        let result = validator.validate(&token);
        assert!(matches!(result, Err(AuthError::Expired)));
    }

    #[test]
    fn leeway_absorbs_clock_skew() {
        // Expired 10 seconds ago, but 30 seconds of leeway keeps it alive.
        let token = signed_claims(&claims_with_lifetime(-120, -10), KEY_A);

        let strict = validator(ring(), Duration::ZERO);
        assert!(matches!(strict.validate(&token), Err(AuthError::Expired)));

        let lenient = validator(ring(), Duration::from_secs(30));
        assert!(lenient.validate(&token).is_ok());
    }

    #[test]
    fn previous_key_still_verifies_after_rotation() {
        let keyring = ring();
        let issuer = TokenIssuer::new(keyring.clone(), ISSUER);
        let validator = validator(keyring.clone(), Duration::from_secs(5));

        let issued = issuer.issue(123_456, Duration::from_secs(3600)).expect("issuance");
        keyring.rotate("v2", KEY_B).expect("rotation");

        let claims = validator.validate(&issued.token).expect("grace-period validation");
        assert_eq!(claims.sub, "123456");
    }

    #[test]
    fn token_dies_after_two_rotations() {
        let keyring = ring();
        let issuer = TokenIssuer::new(keyring.clone(), ISSUER);
        let validator = validator(keyring.clone(), Duration::from_secs(5));

        let issued = issuer.issue(123_456, Duration::from_secs(3600)).expect("issuance");
        keyring.rotate("v2", KEY_B).expect("first rotation");
        keyring.rotate("v3", &[0x33; 32]).expect("second rotation");

        let result = validator.validate(&issued.token);
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn tokens_minted_after_rotation_verify_with_the_new_key() {
        let keyring = ring();
        let issuer = TokenIssuer::new(keyring.clone(), ISSUER);
        let validator = validator(keyring.clone(), Duration::from_secs(5));

        keyring.rotate("v2", KEY_B).expect("rotation");
        let issued = issuer.issue(123_456, Duration::from_secs(3600)).expect("issuance");

        assert!(validator.validate(&issued.token).is_ok());
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let validator = validator(ring(), Duration::ZERO);
        let mut claims = claims_with_lifetime(0, 3600);
        claims.iss = "https://somewhere-else.dev".to_string();
        let token = signed_claims(&claims, KEY_A);

        let result = validator.validate(&token);
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn non_hs256_algorithm_is_rejected() {
        let validator = validator(ring(), Duration::ZERO);
        // Same claims, but an HS384 header; the key never gets a say.
        let claims = claims_with_lifetime(0, 3600);
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(KEY_A),
        )
        .expect("encodable claims");

        let result = validator.validate(&token);
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }
}
