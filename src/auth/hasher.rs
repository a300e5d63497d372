//! Salted, adaptive-cost hashing of client secrets.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
};

use super::error::AuthError;

/// One-way hashing and verification of client secrets.
///
/// Digests are PHC strings with algorithm, salt and cost embedded, so two
/// hashes of the same secret never compare equal. Verification goes through
/// Argon2's own comparison; a malformed digest verifies as `false` and is
/// indistinguishable from a wrong secret to the caller.
#[derive(Clone, Default)]
pub struct SecretHasher {
    argon2: Argon2<'static>,
}

impl SecretHasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a hasher with explicit cost parameters. Tests use the cheapest
    /// allowed parameters; production sticks with the crate defaults.
    #[must_use]
    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Hash a plaintext secret into a salted PHC digest.
    ///
    /// # Errors
    /// Returns an error if digest computation fails.
    pub fn hash(&self, secret: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self
            .argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|err| AuthError::ServiceUnavailable(format!("secret hashing failed: {err}")))?;
        Ok(digest.to_string())
    }

    /// Recompute and compare. Never returns an error: a digest that does not
    /// parse yields `false`, exactly like a wrong secret would.
    #[must_use]
    pub fn verify(&self, secret: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        self.argon2.verify_password(secret.as_bytes(), &parsed).is_ok()
    }
}
