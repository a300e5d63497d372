//! Versioned signing-key ring.
//!
//! The ring always holds a current key and, after a rotation, the
//! immediately preceding one so validators keep accepting tokens minted just
//! before the switch. It is explicitly injected into the issuer and
//! validator at construction rather than living in a hidden singleton.

use anyhow::{bail, Result};
use jsonwebtoken::{DecodingKey, EncodingKey};
use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::info;

/// Minimum HMAC key material: 256 bits.
pub const MIN_KEY_BYTES: usize = 32;

pub(crate) struct SigningKey {
    pub(crate) kid: String,
    pub(crate) encoding: EncodingKey,
    pub(crate) decoding: DecodingKey,
}

impl SigningKey {
    fn from_bytes(kid: String, key: &[u8]) -> Result<Self> {
        if kid.is_empty() {
            bail!("signing key id must not be empty");
        }
        if key.len() < MIN_KEY_BYTES {
            bail!(
                "signing key '{kid}' is too weak: {} bits, minimum {} bits",
                key.len() * 8,
                MIN_KEY_BYTES * 8
            );
        }
        Ok(Self {
            kid,
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
        })
    }
}

struct KeyRingState {
    current: Arc<SigningKey>,
    previous: Option<Arc<SigningKey>>,
}

/// Current + optional previous signing key, rotation-safe for readers.
///
/// Steady-state issuance and validation only take the read side of the lock;
/// rotation is a rare administrator-triggered write.
pub struct KeyRing {
    state: RwLock<KeyRingState>,
}

impl KeyRing {
    /// # Errors
    /// Returns an error if the key id is empty or the key material is weaker
    /// than [`MIN_KEY_BYTES`].
    pub fn new(kid: impl Into<String>, key: &[u8]) -> Result<Self> {
        let current = Arc::new(SigningKey::from_bytes(kid.into(), key)?);
        Ok(Self {
            state: RwLock::new(KeyRingState {
                current,
                previous: None,
            }),
        })
    }

    /// Seed the grace-period key, for processes restarting mid-rotation.
    ///
    /// # Errors
    /// Returns an error under the same conditions as [`KeyRing::new`].
    pub fn with_previous(self, kid: impl Into<String>, key: &[u8]) -> Result<Self> {
        let previous = Arc::new(SigningKey::from_bytes(kid.into(), key)?);
        self.write().previous = Some(previous);
        Ok(self)
    }

    /// Install a new current key; the old current becomes the grace-period
    /// previous key and the old previous key stops verifying anything.
    ///
    /// # Errors
    /// Returns an error under the same conditions as [`KeyRing::new`].
    pub fn rotate(&self, kid: impl Into<String>, key: &[u8]) -> Result<()> {
        let fresh = Arc::new(SigningKey::from_bytes(kid.into(), key)?);
        let mut state = self.write();
        info!(
            from = %state.current.kid,
            to = %fresh.kid,
            "rotating signing key"
        );
        state.previous = Some(Arc::clone(&state.current));
        state.current = fresh;
        Ok(())
    }

    #[must_use]
    pub fn current_kid(&self) -> String {
        self.read().current.kid.clone()
    }

    pub(crate) fn signing_key(&self) -> Arc<SigningKey> {
        Arc::clone(&self.read().current)
    }

    pub(crate) fn verification_keys(&self) -> (Arc<SigningKey>, Option<Arc<SigningKey>>) {
        let state = self.read();
        (Arc::clone(&state.current), state.previous.clone())
    }

    fn read(&self) -> RwLockReadGuard<'_, KeyRingState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, KeyRingState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("KeyRing")
            .field("current", &state.current.kid)
            .field("previous", &state.previous.as_ref().map(|key| key.kid.clone()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_A: &[u8] = &[0xa5; 32];
    const KEY_B: &[u8] = &[0x5a; 32];

    #[test]
    fn new_rejects_weak_keys() {
        let result = KeyRing::new("v1", &[0u8; 16]);
        assert!(result.is_err());
    }

    #[test]
    fn new_rejects_empty_kid() {
        let result = KeyRing::new("", KEY_A);
        assert!(result.is_err());
    }

    #[test]
    fn fresh_ring_has_no_previous_key() {
        let ring = KeyRing::new("v1", KEY_A).expect("ring construction");
        let (current, previous) = ring.verification_keys();
        assert_eq!(current.kid, "v1");
        assert!(previous.is_none());
    }

    #[test]
    fn rotate_moves_current_to_previous() {
        let ring = KeyRing::new("v1", KEY_A).expect("ring construction");
        ring.rotate("v2", KEY_B).expect("rotation");

        let (current, previous) = ring.verification_keys();
        assert_eq!(current.kid, "v2");
        assert_eq!(previous.map(|key| key.kid.clone()), Some("v1".to_string()));
        assert_eq!(ring.current_kid(), "v2");
    }

    #[test]
    fn second_rotation_drops_the_oldest_key() {
        let ring = KeyRing::new("v1", KEY_A).expect("ring construction");
        ring.rotate("v2", KEY_B).expect("first rotation");
        ring.rotate("v3", KEY_A).expect("second rotation");

        let (current, previous) = ring.verification_keys();
        assert_eq!(current.kid, "v3");
        assert_eq!(previous.map(|key| key.kid.clone()), Some("v2".to_string()));
    }

    #[test]
    fn with_previous_seeds_the_grace_key() {
        let ring = KeyRing::new("v2", KEY_B)
            .and_then(|ring| ring.with_previous("v1", KEY_A))
            .expect("ring construction");

        let (current, previous) = ring.verification_keys();
        assert_eq!(current.kid, "v2");
        assert_eq!(previous.map(|key| key.kid.clone()), Some("v1".to_string()));
    }

    #[test]
    fn debug_output_shows_kids_only() {
        let ring = KeyRing::new("v1", KEY_A).expect("ring construction");
        let rendered = format!("{ring:?}");
        assert!(rendered.contains("v1"));
        assert!(!rendered.contains("a5a5"));
    }
}
