//! Configuration structures for hashbin-core.
//!
//! This module defines explicit configuration objects used by higher-level
//! components (CLI, repository tooling) to control bin partitioning and the
//! shape of the delegation metadata.
//!
//! The core crate itself does not read environment variables or the system
//! clock. All configuration, including the issue timestamp, must be provided
//! explicitly by the caller to preserve determinism.

use time::{Duration, OffsetDateTime};

use crate::errors::{HashbinError, HashbinResult};
use crate::version::{SpecVersion, SPEC_VERSION};

/// Largest accepted bin count (four hex prefix digits).
pub const MAX_BIN_COUNT: u32 = 1 << 16;

/// Default number of bins.
pub const DEFAULT_BIN_COUNT: u32 = 32;

/// Default role name of the delegating document.
pub const DEFAULT_PARENT_ROLE: &str = "bins";

/// Validated bin configuration with its derived constants.
///
/// Construct with [`BinConfig::new`]; the derived values are computed once and
/// never recomputed ad hoc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinConfig {
    bin_count: u32,
    prefix_len: usize,
    prefix_space: u64,
    bin_size: u64,
}

impl BinConfig {
    /// Validate a bin count and derive prefix length, prefix space and bin size.
    pub fn new(bin_count: u32) -> HashbinResult<Self> {
        if bin_count == 0 {
            return Err(HashbinError::invalid_configuration(
                "bin count must be positive",
            ));
        }
        if !bin_count.is_power_of_two() {
            return Err(HashbinError::invalid_configuration(format!(
                "bin count must be a power of two, got {bin_count}"
            )));
        }
        if bin_count > MAX_BIN_COUNT {
            return Err(HashbinError::invalid_configuration(format!(
                "bin count must not exceed {MAX_BIN_COUNT}, got {bin_count}"
            )));
        }

        let cfg = Self::derive(bin_count);
        if cfg.bin_size * u64::from(bin_count) != cfg.prefix_space {
            return Err(HashbinError::invalid_configuration(format!(
                "bin count {bin_count} does not evenly divide prefix space {}",
                cfg.prefix_space
            )));
        }
        Ok(cfg)
    }

    /// Derived constants for a non-zero bin count.
    const fn derive(bin_count: u32) -> Self {
        // Hex digits needed for `bin_count - 1`; zero still needs one digit.
        let mut prefix_len = 1;
        let mut rest = (bin_count - 1) >> 4;
        while rest > 0 {
            prefix_len += 1;
            rest >>= 4;
        }
        let prefix_space = 16u64.pow(prefix_len as u32);
        Self {
            bin_count,
            prefix_len,
            prefix_space,
            bin_size: prefix_space / bin_count as u64,
        }
    }

    pub fn bin_count(&self) -> u32 {
        self.bin_count
    }

    /// Number of leading hex digits of a path hash that select its bin.
    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    /// Total number of distinct hash prefixes (`16^prefix_len`).
    pub fn prefix_space(&self) -> u64 {
        self.prefix_space
    }

    /// Number of consecutive prefixes served by each bin.
    pub fn bin_size(&self) -> u64 {
        self.bin_size
    }
}

impl Default for BinConfig {
    fn default() -> Self {
        Self::derive(DEFAULT_BIN_COUNT)
    }
}

/// Full configuration for building a delegation graph.
#[derive(Debug, Clone)]
pub struct DelegationConfig {
    pub bins: BinConfig,
    /// Metadata format version written into every document.
    pub spec_version: String,
    /// Issue time chosen by the caller; expiries are computed relative to it.
    pub issued_at: OffsetDateTime,
    /// Lifetime of the delegating document.
    pub parent_expiry: Duration,
    /// Lifetime of each bin document. Shorter than the parent: bins churn more.
    pub bin_expiry: Duration,
    /// Role name of the delegating document.
    pub parent_role: String,
}

impl DelegationConfig {
    pub fn new(bins: BinConfig, issued_at: OffsetDateTime) -> Self {
        Self {
            bins,
            spec_version: SPEC_VERSION.to_string(),
            issued_at,
            parent_expiry: Duration::days(365),
            bin_expiry: Duration::days(7),
            parent_role: DEFAULT_PARENT_ROLE.to_string(),
        }
    }

    pub fn with_expiries(mut self, parent: Duration, bin: Duration) -> Self {
        self.parent_expiry = parent;
        self.bin_expiry = bin;
        self
    }

    pub fn with_parent_role(mut self, role: impl Into<String>) -> Self {
        self.parent_role = role.into();
        self
    }

    /// Expiry timestamp of the delegating document.
    pub fn parent_expires(&self) -> HashbinResult<String> {
        format_expiry(expiry_after(self.issued_at, self.parent_expiry)?)
    }

    /// Expiry timestamp shared by all bin documents.
    pub fn bin_expires(&self) -> HashbinResult<String> {
        format_expiry(expiry_after(self.issued_at, self.bin_expiry)?)
    }
}

fn expiry_after(issued_at: OffsetDateTime, lifetime: Duration) -> HashbinResult<OffsetDateTime> {
    issued_at.checked_add(lifetime).ok_or_else(|| {
        HashbinError::invalid_configuration(format!(
            "expiry {} days after {issued_at} is out of range",
            lifetime.whole_days()
        ))
    })
}

/// Whether `role` is usable as a role name.
///
/// Role names end up as file names, so they are restricted to a flat alphabet
/// (`[A-Za-z0-9._-]`) and may not start with a dot.
pub fn is_valid_role_name(role: &str) -> bool {
    !role.is_empty()
        && !role.starts_with('.')
        && role
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

/// Render a timestamp as `YYYY-MM-DDTHH:MM:SSZ` in UTC, dropping sub-seconds.
pub fn format_expiry(at: OffsetDateTime) -> HashbinResult<String> {
    let at = at
        .to_offset(time::UtcOffset::UTC)
        .replace_nanosecond(0)
        .map_err(|e| HashbinError::invalid_configuration(format!("invalid timestamp: {e}")))?;
    let fmt = time::macros::format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
    at.format(&fmt)
        .map_err(|e| HashbinError::invalid_configuration(format!("invalid timestamp: {e}")))
}

/// Validate a full configuration object.
pub fn validate_config(cfg: &DelegationConfig) -> HashbinResult<()> {
    SpecVersion::parse(&cfg.spec_version)
        .map_err(|e| HashbinError::invalid_configuration(e.to_string()))?;

    if cfg.parent_expiry <= Duration::ZERO || cfg.bin_expiry <= Duration::ZERO {
        return Err(HashbinError::invalid_configuration(
            "expiries must be positive",
        ));
    }

    if cfg.bin_expiry > cfg.parent_expiry {
        return Err(HashbinError::invalid_configuration(
            "bin expiry must not exceed parent expiry",
        ));
    }

    cfg.parent_expires()?;
    cfg.bin_expires()?;

    if !is_valid_role_name(&cfg.parent_role) {
        return Err(HashbinError::invalid_configuration(format!(
            "invalid parent role name {:?}",
            cfg.parent_role
        )));
    }

    if crate::partition::is_bin_name(&cfg.bins, &cfg.parent_role) {
        return Err(HashbinError::invalid_configuration(format!(
            "parent role name {:?} collides with a bin name",
            cfg.parent_role
        )));
    }

    Ok(())
}
