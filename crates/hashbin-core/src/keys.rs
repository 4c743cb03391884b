//! Ed25519 key types.
//!
//! Two keys are provisioned for a hash bin delegation: one for the delegating
//! document and one shared by every bin document. Keys are identified by the
//! content-derived id of their public [`KeyRecord`].

use std::fmt;

use ed25519_dalek::{SigningKey, VerifyingKey};

use crate::errors::{HashbinError, HashbinResult};
use crate::model::KeyRecord;

/// An Ed25519 signing key pair.
pub struct KeyPair {
    inner: SigningKey,
}

impl KeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let mut rng = rand_core::OsRng;
        Self {
            inner: SigningKey::generate(&mut rng),
        }
    }

    /// Parse from the hex encoding of a 32-byte secret seed.
    pub fn from_seed_hex(s: &str) -> HashbinResult<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| HashbinError::invalid_argument(format!("invalid key hex: {e}")))?;
        let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            HashbinError::invalid_argument(format!("expected 32 seed bytes, got {}", bytes.len()))
        })?;
        Ok(Self {
            inner: SigningKey::from_bytes(&seed),
        })
    }

    /// Hex encoding of the secret seed.
    pub fn to_seed_hex(&self) -> String {
        hex::encode(self.inner.to_bytes())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.inner.verifying_key()
    }

    /// Public key entry for a delegation key table.
    pub fn key_record(&self) -> KeyRecord {
        KeyRecord::ed25519(hex::encode(self.inner.verifying_key().as_bytes()))
    }

    pub fn key_id(&self) -> HashbinResult<String> {
        self.key_record().key_id()
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let public = hex::encode(self.inner.verifying_key().as_bytes());
        write!(f, "KeyPair(public={}..., secret=[REDACTED])", &public[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_roundtrip_preserves_identity() {
        let k = KeyPair::generate();
        let parsed = KeyPair::from_seed_hex(&k.to_seed_hex()).unwrap();
        assert_eq!(parsed.key_id().unwrap(), k.key_id().unwrap());
    }

    #[test]
    fn rejects_bad_seed() {
        assert!(KeyPair::from_seed_hex("zz").is_err());
        assert!(KeyPair::from_seed_hex("abcd").is_err());
    }

    #[test]
    fn debug_redacts_secret() {
        let k = KeyPair::generate();
        let s = format!("{k:?}");
        assert!(s.contains("REDACTED"));
        assert!(!s.contains(&k.to_seed_hex()));
    }

    #[test]
    fn distinct_keys_distinct_ids() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        assert_ne!(a.key_id().unwrap(), b.key_id().unwrap());
    }
}
