//! Store error types.

use hashbin_core::config::is_valid_role_name;
use hashbin_core::HashbinError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid role name: {0:?}")]
    InvalidRole(String),

    #[error("role not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Convert into the core persistence error for `role`.
    pub fn into_persistence(self, role: &str) -> HashbinError {
        HashbinError::persistence(role, self.to_string())
    }
}

/// Role names become file names; keep them to a flat, safe alphabet.
pub(crate) fn check_role(role: &str) -> StoreResult<()> {
    if is_valid_role_name(role) {
        Ok(())
    } else {
        Err(StoreError::InvalidRole(role.to_string()))
    }
}
