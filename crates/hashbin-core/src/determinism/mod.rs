//! Deterministic primitives shared by the partitioner and the document model.

pub mod canonical_json;
pub mod hashing;
pub mod stable_sort;
