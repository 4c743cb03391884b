//! Hash bin partitioning.
//!
//! Target paths are distributed over a fixed number of bins by the leading hex
//! digits of the sha256 of the path. Each bin serves a contiguous, inclusive
//! range `[low, high]` of prefix values, where `high = low + bin_size - 1`.
//!
//! Bin names are the zero-padded lowercase hex of `low` when a bin serves a
//! single prefix, and `low-high` otherwise, e.g. with 32 bins:
//!
//! ```text
//! 00-07  00 01 02 03 04 05 06 07
//! 08-0f  08 09 0a 0b 0c 0d 0e 0f
//! ...
//! f8-ff  f8 f9 fa fb fc fd fe ff
//! ```
//!
//! [`generate_bins`] and [`find_hash_bin`] share [`bin_name`], which is what
//! keeps the two in agreement: every path maps to exactly one generated bin.

use crate::config::BinConfig;
use crate::determinism::hashing::{hex_prefix_value, path_hash_hex};
use crate::errors::HashbinResult;

/// A delegated partition of the hash prefix space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bin {
    name: String,
    low: u64,
    high: u64,
    hash_prefixes: Vec<String>,
}

impl Bin {
    fn new(cfg: &BinConfig, low: u64) -> Self {
        let high = low + cfg.bin_size() - 1;
        let width = cfg.prefix_len();
        let hash_prefixes = (low..=high).map(|p| format!("{p:0width$x}")).collect();
        Self {
            name: bin_name(cfg, low, high),
            low,
            high,
            hash_prefixes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First prefix value served by this bin.
    pub fn low(&self) -> u64 {
        self.low
    }

    /// Last prefix value served by this bin (inclusive).
    pub fn high(&self) -> u64 {
        self.high
    }

    /// Every prefix served by this bin, as zero-padded lowercase hex.
    ///
    /// Delegation records carry this explicit list rather than a range so that
    /// clients can do plain membership lookup.
    pub fn hash_prefixes(&self) -> &[String] {
        &self.hash_prefixes
    }

    pub fn contains(&self, prefix: u64) -> bool {
        (self.low..=self.high).contains(&prefix)
    }
}

/// Name a bin by the prefix range it serves.
pub fn bin_name(cfg: &BinConfig, low: u64, high: u64) -> String {
    let width = cfg.prefix_len();
    if low == high {
        format!("{low:0width$x}")
    } else {
        format!("{low:0width$x}-{high:0width$x}")
    }
}

/// Iterator over all bins of a configuration, in ascending prefix order.
#[derive(Debug, Clone)]
pub struct HashBins {
    cfg: BinConfig,
    next_low: u64,
}

impl Iterator for HashBins {
    type Item = Bin;

    fn next(&mut self) -> Option<Bin> {
        if self.next_low >= self.cfg.prefix_space() {
            return None;
        }
        let bin = Bin::new(&self.cfg, self.next_low);
        self.next_low += self.cfg.bin_size();
        Some(bin)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = ((self.cfg.prefix_space() - self.next_low.min(self.cfg.prefix_space()))
            / self.cfg.bin_size()) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for HashBins {}

/// Lazily walk the prefix space in `bin_size` steps.
pub fn hash_bins(cfg: &BinConfig) -> HashBins {
    HashBins {
        cfg: *cfg,
        next_low: 0,
    }
}

/// Generate the full, ordered set of bins for a configuration.
///
/// Produces exactly `bin_count` bins whose ranges cover `[0, prefix_space - 1]`
/// without gaps or overlaps. Deterministic and side-effect free.
pub fn generate_bins(cfg: &BinConfig) -> Vec<Bin> {
    let bins: Vec<Bin> = hash_bins(cfg).collect();
    tracing::debug!(
        bin_count = bins.len(),
        prefix_len = cfg.prefix_len(),
        bin_size = cfg.bin_size(),
        "generated hash bins"
    );
    bins
}

/// Numeric hash prefix of a target path.
pub fn path_prefix(cfg: &BinConfig, path: &str) -> HashbinResult<u64> {
    hex_prefix_value(&path_hash_hex(path), cfg.prefix_len())
}

/// Name of the bin serving a given prefix value.
pub fn bin_for_prefix(cfg: &BinConfig, prefix: u64) -> String {
    let low = prefix - (prefix % cfg.bin_size());
    let high = low + cfg.bin_size() - 1;
    bin_name(cfg, low, high)
}

/// Name of the bin responsible for a target path.
///
/// Pure arithmetic over the path hash; never materializes the bin list.
pub fn find_hash_bin(cfg: &BinConfig, path: &str) -> HashbinResult<String> {
    Ok(bin_for_prefix(cfg, path_prefix(cfg, path)?))
}

/// Whether `name` is the name of one of the configuration's bins.
pub fn is_bin_name(cfg: &BinConfig, name: &str) -> bool {
    let width = cfg.prefix_len();
    let parse = |s: &str| -> Option<u64> {
        if s.len() != width || !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return None;
        }
        u64::from_str_radix(s, 16).ok()
    };

    let low = match name.split_once('-') {
        Some((lo, _)) => parse(lo),
        None => parse(name),
    };
    match low {
        Some(low) if low < cfg.prefix_space() => bin_for_prefix(cfg, low) == name,
        _ => false,
    }
}
