//! Deterministic hashing utilities.
//!
//! All hashes used by hashbin are:
//! - deterministic
//! - explicitly parameterized
//! - rendered as lowercase hex when exposed as strings
//!
//! Supported algorithms:
//! - sha256
//!
//! Target path hashes feed directly into bin assignment, so the byte encoding
//! (UTF-8) and digest choice here are part of the client-compatibility contract.

use sha2::{Digest, Sha256};

use crate::errors::{HashbinError, HashbinResult};

/// Hash algorithm identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlg {
    Sha256,
}

impl HashAlg {
    pub fn parse(s: &str) -> HashbinResult<Self> {
        match s {
            "sha256" => Ok(HashAlg::Sha256),
            _ => Err(HashbinError::invalid_argument(format!(
                "unsupported hash algorithm: {s}"
            ))),
        }
    }

    /// Name used as the key in a target's `hashes` map.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

/// Hash raw bytes using the selected algorithm.
pub fn hash_bytes(alg: HashAlg, bytes: &[u8]) -> Vec<u8> {
    match alg {
        HashAlg::Sha256 => {
            let mut h = Sha256::new();
            h.update(bytes);
            h.finalize().to_vec()
        }
    }
}

/// Hash raw bytes with sha256 and return a lowercase hex string.
pub fn hash_bytes_hex(bytes: &[u8]) -> String {
    hex::encode(hash_bytes(HashAlg::Sha256, bytes))
}

/// Hash a target path for bin assignment.
///
/// The path is hashed exactly as given (UTF-8 bytes, no normalization).
pub fn path_hash_hex(path: &str) -> String {
    hash_bytes_hex(path.as_bytes())
}

/// Parse the leading `digits` hex characters of a hex digest as an integer.
pub fn hex_prefix_value(digest_hex: &str, digits: usize) -> HashbinResult<u64> {
    if digits == 0 || digits > 15 {
        return Err(HashbinError::invalid_argument(format!(
            "hex prefix length out of range: {digits}"
        )));
    }
    let prefix = digest_hex.get(..digits).ok_or_else(|| {
        HashbinError::invalid_argument(format!(
            "digest shorter than {digits} hex digits: {digest_hex}"
        ))
    })?;
    u64::from_str_radix(prefix, 16)
        .map_err(|_| HashbinError::invalid_argument(format!("invalid hex prefix: {prefix}")))
}
