//! Metadata document models.
//!
//! Strongly-typed representations of the trust documents produced by the
//! delegation builder. Instead of one generic document distinguished at
//! runtime by role name, each document kind has its own struct:
//! - [`DelegatingTargets`]: the parent ("bins") document holding the
//!   delegation record
//! - [`DelegatedTargets`]: one per bin, holding that bin's artifacts
//!
//! Notes on serde:
//! - Field names follow the established wire format (`_type`, `spec_version`,
//!   `path_hash_prefixes`, ...).
//! - Maps are `BTreeMap`s so iteration order is stable; the delegation role
//!   list is a `Vec` because its order is significant to clients.
//! - Signatures are computed over `crate::determinism::canonical_json` bytes,
//!   never over default `serde_json` formatting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::determinism::canonical_json::canonical_bytes_of;
use crate::determinism::hashing::{hash_bytes_hex, HashAlg};
use crate::errors::HashbinResult;

/// Document type tag shared by delegating and delegated documents.
pub const TARGETS_TYPE: &str = "targets";

/// Public key entry as embedded in a delegation key table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub keytype: String,
    pub scheme: String,
    pub keyval: KeyValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    /// Lowercase hex of the public key bytes.
    pub public: String,
}

impl KeyRecord {
    pub fn ed25519(public_hex: impl Into<String>) -> Self {
        Self {
            keytype: "ed25519".to_string(),
            scheme: "ed25519".to_string(),
            keyval: KeyValue {
                public: public_hex.into(),
            },
        }
    }

    /// Content-derived key id: sha256 hex of the canonical encoding.
    pub fn key_id(&self) -> HashbinResult<String> {
        Ok(hash_bytes_hex(&canonical_bytes_of(self)?))
    }
}

/// A signature over the canonical encoding of a document's `signed` part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub keyid: String,
    /// Lowercase hex signature bytes.
    pub sig: String,
}

/// Length, hashes and optional custom metadata of one target artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub length: u64,
    pub hashes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<Value>,
}

impl ArtifactRecord {
    /// Build a record from artifact bytes (length + sha256).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hashes = BTreeMap::new();
        hashes.insert(HashAlg::Sha256.as_str().to_string(), hash_bytes_hex(bytes));
        Self {
            length: bytes.len() as u64,
            hashes,
            custom: None,
        }
    }

    /// Build a record from a precomputed length and sha256 hex digest.
    pub fn from_sha256(length: u64, sha256_hex: impl Into<String>) -> Self {
        let mut hashes = BTreeMap::new();
        hashes.insert(HashAlg::Sha256.as_str().to_string(), sha256_hex.into());
        Self {
            length,
            hashes,
            custom: None,
        }
    }

    pub fn with_custom(mut self, custom: Value) -> Self {
        self.custom = Some(custom);
        self
    }
}

/// Delegation entry for one bin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatedRoleSpec {
    pub name: String,
    pub keyids: Vec<String>,
    pub threshold: u32,
    pub terminating: bool,
    pub path_hash_prefixes: Vec<String>,
}

/// Delegation record of the parent document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegations {
    /// Key id to public key, for every key used by any delegated role.
    pub keys: BTreeMap<String, KeyRecord>,
    /// Delegated roles in ascending bin order.
    pub roles: Vec<DelegatedRoleSpec>,
}

impl Delegations {
    pub fn role(&self, name: &str) -> Option<&DelegatedRoleSpec> {
        self.roles.iter().find(|r| r.name == name)
    }

    /// First role whose prefix list contains `prefix_hex`.
    pub fn role_for_prefix(&self, prefix_hex: &str) -> Option<&DelegatedRoleSpec> {
        self.roles
            .iter()
            .find(|r| r.path_hash_prefixes.iter().any(|p| p == prefix_hex))
    }
}

/// The delegating ("bins") document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegatingTargets {
    #[serde(rename = "_type")]
    pub type_: String,
    pub spec_version: String,
    pub version: u64,
    pub expires: String,
    /// Always empty at this level: artifacts live in the bins.
    pub targets: BTreeMap<String, ArtifactRecord>,
    pub delegations: Delegations,
}

/// A delegated ("bin_n") document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegatedTargets {
    #[serde(rename = "_type")]
    pub type_: String,
    pub spec_version: String,
    pub version: u64,
    pub expires: String,
    pub targets: BTreeMap<String, ArtifactRecord>,
}

impl DelegatingTargets {
    pub fn new(spec_version: impl Into<String>, expires: impl Into<String>) -> Self {
        Self {
            type_: TARGETS_TYPE.to_string(),
            spec_version: spec_version.into(),
            version: 1,
            expires: expires.into(),
            targets: BTreeMap::new(),
            delegations: Delegations::default(),
        }
    }
}

impl DelegatedTargets {
    pub fn new(spec_version: impl Into<String>, expires: impl Into<String>) -> Self {
        Self {
            type_: TARGETS_TYPE.to_string(),
            spec_version: spec_version.into(),
            version: 1,
            expires: expires.into(),
            targets: BTreeMap::new(),
        }
    }
}

/// Wire envelope: signed body plus its signatures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata<T> {
    pub signed: T,
    pub signatures: Vec<Signature>,
}

impl<T: Serialize> Metadata<T> {
    /// Canonical bytes of the signed portion (what signers sign).
    pub fn signed_bytes(&self) -> HashbinResult<Vec<u8>> {
        canonical_bytes_of(&self.signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_id_is_stable_and_content_derived() {
        let a = KeyRecord::ed25519("aa".repeat(32));
        let b = KeyRecord::ed25519("aa".repeat(32));
        let c = KeyRecord::ed25519("bb".repeat(32));
        assert_eq!(a.key_id().unwrap(), b.key_id().unwrap());
        assert_ne!(a.key_id().unwrap(), c.key_id().unwrap());
        assert_eq!(a.key_id().unwrap().len(), 64);
    }

    #[test]
    fn artifact_record_from_bytes() {
        let r = ArtifactRecord::from_bytes(b"abc");
        assert_eq!(r.length, 3);
        assert_eq!(
            r.hashes["sha256"],
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let v = serde_json::to_value(&r).unwrap();
        assert!(v.get("custom").is_none());
    }

    #[test]
    fn delegating_document_wire_shape() {
        let mut doc = DelegatingTargets::new("1.0.19", "2030-01-01T00:00:00Z");
        doc.delegations.roles.push(DelegatedRoleSpec {
            name: "00-07".into(),
            keyids: vec!["k".into()],
            threshold: 1,
            terminating: false,
            path_hash_prefixes: vec!["00".into(), "01".into()],
        });
        let v = serde_json::to_value(&doc).unwrap();
        assert_eq!(v["_type"], json!("targets"));
        assert_eq!(v["delegations"]["roles"][0]["path_hash_prefixes"][1], json!("01"));
        assert_eq!(v["targets"], json!({}));
    }

    #[test]
    fn role_lookup_by_prefix() {
        let mut d = Delegations::default();
        for (name, prefixes) in [("0-7", ["0", "1"]), ("8-f", ["8", "9"])] {
            d.roles.push(DelegatedRoleSpec {
                name: name.into(),
                keyids: vec![],
                threshold: 1,
                terminating: false,
                path_hash_prefixes: prefixes.iter().map(|s| s.to_string()).collect(),
            });
        }
        assert_eq!(d.role_for_prefix("9").unwrap().name, "8-f");
        assert!(d.role_for_prefix("a").is_none());
        assert!(d.role("0-7").is_some());
    }
}
