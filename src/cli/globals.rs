use anyhow::{anyhow, Context, Result};
use base64ct::{Base64, Encoding};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

use crate::token::KeyRing;

/// Runtime configuration shared across the service, built once at startup.
///
/// Signing-key material stays wrapped in [`SecretString`] until the key ring
/// is constructed; Debug output never shows it.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub redis_url: String,
    pub events_stream: String,
    pub publish_timeout: Duration,
    pub token_issuer: String,
    pub token_ttl: Duration,
    pub token_leeway: Duration,
    pub signing_key: SecretString,
    pub signing_key_id: String,
    pub previous_signing_key: Option<SecretString>,
    pub previous_signing_key_id: String,
}

impl GlobalArgs {
    /// Build the versioned key ring from the configured key material.
    ///
    /// # Errors
    /// Returns an error if a key is not valid base64 or is weaker than the
    /// minimum the ring accepts.
    pub fn keyring(&self) -> Result<KeyRing> {
        let key = decode_key(&self.signing_key).context("invalid signing key")?;
        let keyring = KeyRing::new(self.signing_key_id.clone(), &key)?;

        match &self.previous_signing_key {
            Some(previous) => {
                let key = decode_key(previous).context("invalid previous signing key")?;
                keyring.with_previous(self.previous_signing_key_id.clone(), &key)
            }
            None => Ok(keyring),
        }
    }
}

fn decode_key(encoded: &SecretString) -> Result<Vec<u8>> {
    Base64::decode_vec(encoded.expose_secret())
        .map_err(|err| anyhow!("signing key is not valid base64: {err}"))
}
