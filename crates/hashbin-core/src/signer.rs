//! Signing seam.
//!
//! The delegation builder only needs `sign(canonical bytes) -> signature`.
//! Anything that can produce a signature for a key id (an in-process key, an
//! offline HSM, a remote key service) implements [`MetadataSigner`].

use ed25519_dalek::Signer as _;

use crate::errors::{HashbinError, HashbinResult};
use crate::keys::KeyPair;
use crate::model::{KeyRecord, Signature};

/// Produces signatures over canonical document encodings.
pub trait MetadataSigner: Send + Sync {
    /// Key id the produced signatures are attributed to.
    fn key_id(&self) -> &str;

    /// Sign canonical bytes.
    ///
    /// Errors are reported as [`HashbinError::Signing`] and are retryable.
    fn sign(&self, canonical: &[u8]) -> HashbinResult<Signature>;
}

/// In-process Ed25519 signer.
pub struct Ed25519Signer {
    key: KeyPair,
    key_id: String,
}

impl Ed25519Signer {
    pub fn new(key: KeyPair) -> HashbinResult<Self> {
        let key_id = key.key_id()?;
        Ok(Self { key, key_id })
    }

    pub fn generate() -> HashbinResult<Self> {
        Self::new(KeyPair::generate())
    }

    pub fn key_record(&self) -> KeyRecord {
        self.key.key_record()
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("key_id", &self.key_id)
            .finish()
    }
}

impl MetadataSigner for Ed25519Signer {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn sign(&self, canonical: &[u8]) -> HashbinResult<Signature> {
        let sig = self.key.signing_key().try_sign(canonical).map_err(|e| {
            HashbinError::signing(self.key_id.clone(), format!("ed25519 signing failed: {e}"))
        })?;
        Ok(Signature {
            keyid: self.key_id.clone(),
            sig: hex::encode(sig.to_bytes()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::Verifier;

    #[test]
    fn signature_verifies_under_public_key() {
        let signer = Ed25519Signer::generate().unwrap();
        let sig = signer.sign(b"payload").unwrap();
        assert_eq!(sig.keyid, signer.key_id());
        assert_eq!(sig.sig.len(), 128);

        let bytes: [u8; 64] = hex::decode(&sig.sig).unwrap().try_into().unwrap();
        let sig = ed25519_dalek::Signature::from_bytes(&bytes);
        signer
            .key_pair()
            .verifying_key()
            .verify(b"payload", &sig)
            .unwrap();
    }

    #[test]
    fn key_id_matches_record() {
        let signer = Ed25519Signer::generate().unwrap();
        assert_eq!(signer.key_record().key_id().unwrap(), signer.key_id());
    }
}
