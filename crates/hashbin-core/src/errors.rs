//! Error types for hashbin-core.
//!
//! Every fallible operation in the core returns [`HashbinResult`]. Variants map
//! one-to-one onto the failure classes callers need to distinguish:
//! - configuration errors are rejected before any document exists
//! - assignment inconsistencies are partitioner bugs and never retryable
//! - signing and persistence errors are per-document and retryable
//! - sealed-document errors are programming errors (mutation after signing)

use thiserror::Error;

/// Result alias used throughout the crate.
pub type HashbinResult<T> = Result<T, HashbinError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HashbinError {
    /// Bad bin count or delegation configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The computed bin for a path does not exist in the generated bin set.
    #[error("assignment inconsistency: path {path:?} mapped to unknown bin {bin:?}")]
    AssignmentInconsistency { path: String, bin: String },

    /// A mutation was attempted on a document that already carries a signature.
    #[error("document {role:?} is signed and can no longer be modified")]
    DocumentSealed { role: String },

    /// External signer failure.
    #[error("signing failed for {role:?}: {reason}")]
    Signing { role: String, reason: String },

    /// Durable write failure.
    #[error("persistence failed for {role:?}: {reason}")]
    Persistence { role: String, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl HashbinError {
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    pub fn signing(role: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Signing {
            role: role.into(),
            reason: reason.into(),
        }
    }

    pub fn persistence(role: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Persistence {
            role: role.into(),
            reason: reason.into(),
        }
    }

    /// Whether retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Signing { .. } | Self::Persistence { .. })
    }
}

impl From<serde_json::Error> for HashbinError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classes() {
        assert!(HashbinError::signing("bins", "hsm offline").is_retryable());
        assert!(HashbinError::persistence("00-07", "disk full").is_retryable());
        assert!(!HashbinError::invalid_configuration("bad").is_retryable());
        assert!(!HashbinError::AssignmentInconsistency {
            path: "a".into(),
            bin: "zz".into()
        }
        .is_retryable());
    }

    #[test]
    fn display_mentions_role() {
        let e = HashbinError::DocumentSealed {
            role: "80-87".into(),
        };
        assert!(e.to_string().contains("80-87"));
    }
}
