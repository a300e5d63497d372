//! Credential verification and the authentication flow.

pub mod error;
pub mod hasher;
pub mod orchestrator;
pub mod verifier;

pub use error::AuthError;
pub use hasher::SecretHasher;
pub use orchestrator::{Authenticator, RetryPolicy, TokenGrant};
pub use verifier::{CredentialVerifier, VerifiedClient};
