//! Ordering checks.
//!
//! The delegation role list is consumed in order by clients, so the order in
//! which bins are emitted is part of the wire contract. These helpers make
//! that ordering explicit and checkable.

use crate::errors::{HashbinError, HashbinResult};

/// Ensure a slice is strictly ascending by the extracted key.
///
/// Returns an error naming the first out-of-order position.
pub fn ensure_strictly_ascending<T, K, F>(items: &[T], mut key_fn: F) -> HashbinResult<()>
where
    F: FnMut(&T) -> K,
    K: Ord,
{
    for (i, w) in items.windows(2).enumerate() {
        if key_fn(&w[0]) >= key_fn(&w[1]) {
            return Err(HashbinError::invariant(format!(
                "collection is not strictly ascending at index {}",
                i + 1
            )));
        }
    }
    Ok(())
}
