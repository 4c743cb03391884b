//! Version helpers.
//!
//! Metadata documents carry a `spec_version` string. Only the 1.x line of the
//! metadata format is produced by this crate; parsing is strict so that a typo
//! in configuration is caught before any document is built.

use std::fmt;

use crate::errors::{HashbinError, HashbinResult};

/// Metadata format version written into every document.
pub const SPEC_VERSION: &str = "1.0.19";

/// Supported major version of the metadata format.
pub const SUPPORTED_MAJOR: u32 = 1;

/// A parsed `MAJOR.MINOR.PATCH` metadata format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SpecVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SpecVersion {
    /// Parse a spec version string (e.g. "1.0.19").
    pub fn parse(s: &str) -> HashbinResult<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(HashbinError::invalid_argument(format!(
                "unsupported spec version: {s}"
            )));
        }

        let mut nums = [0u32; 3];
        for (slot, part) in nums.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(HashbinError::invalid_argument(format!(
                    "unsupported spec version: {s}"
                )));
            }
            *slot = part.parse().map_err(|_| {
                HashbinError::invalid_argument(format!("unsupported spec version: {s}"))
            })?;
        }

        let v = Self {
            major: nums[0],
            minor: nums[1],
            patch: nums[2],
        };
        if v.major != SUPPORTED_MAJOR {
            return Err(HashbinError::invalid_argument(format!(
                "unsupported spec version: {s} (major must be {SUPPORTED_MAJOR})"
            )));
        }
        Ok(v)
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
