//! In-memory store.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use hashbin_core::store::MetadataStore;
use hashbin_core::HashbinResult;

use crate::error::check_role;

#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, role: &str) -> Option<Vec<u8>> {
        self.docs.lock().get(role).cloned()
    }

    pub fn len(&self) -> usize {
        self.docs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.lock().is_empty()
    }

    /// Stored role names, sorted.
    pub fn roles(&self) -> Vec<String> {
        self.docs.lock().keys().cloned().collect()
    }
}

impl MetadataStore for MemoryStore {
    fn store(&self, role: &str, bytes: &[u8]) -> HashbinResult<()> {
        check_role(role).map_err(|e| e.into_persistence(role))?;
        self.docs.lock().insert(role.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_keeps_latest() {
        let s = MemoryStore::new();
        s.store("bins", b"1").unwrap();
        s.store("bins", b"2").unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s.get("bins").unwrap(), b"2");
        assert!(s.store("", b"x").is_err());
    }
}
