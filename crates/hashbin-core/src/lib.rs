//! hashbin-core
//!
//! Core primitives for hash bin delegation:
//! - Bin partitioning of target paths by path-hash prefix
//! - Delegating/delegated metadata document models
//! - Delegation graph construction, artifact assignment and signing
//! - Canonical JSON encoding and sha256 hashing
//! - Ed25519 keys and the signer / store seams
//!
//! The crate performs no filesystem or network I/O and never reads the system
//! clock. Persistence and signing backends are plugged in through
//! [`store::MetadataStore`] and [`signer::MetadataSigner`].

pub mod config;
pub mod delegation;
pub mod determinism;
pub mod errors;
pub mod keys;
pub mod model;
pub mod partition;
pub mod signer;
pub mod store;
pub mod version;

pub use crate::errors::{HashbinError, HashbinResult};

/// Convenience re-exports.
pub mod prelude {
    pub use crate::config::{validate_config, BinConfig, DelegationConfig};
    pub use crate::delegation::{
        DelegationGraph, DocumentState, FinalizeReport, SignOutcome, SignStatus, SignedDocument,
    };
    pub use crate::keys::KeyPair;
    pub use crate::model::{
        ArtifactRecord, DelegatedRoleSpec, DelegatedTargets, DelegatingTargets, Delegations,
        KeyRecord, Metadata, Signature,
    };
    pub use crate::partition::{find_hash_bin, generate_bins, Bin};
    pub use crate::signer::{Ed25519Signer, MetadataSigner};
    pub use crate::store::{persist_all, MetadataStore, PersistReport, RetryPolicy};
    pub use crate::{HashbinError, HashbinResult};
}
