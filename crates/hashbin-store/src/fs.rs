//! Filesystem store.
//!
//! Layout: `<root>/<role>.json`, pretty-printed JSON envelopes. Writes go to a
//! temporary sibling file first and are renamed into place, so a crashed write
//! never leaves a truncated document under a role's name.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use walkdir::WalkDir;

use hashbin_core::model::Metadata;
use hashbin_core::store::MetadataStore;
use hashbin_core::HashbinResult;

use crate::error::{check_role, StoreError, StoreResult};

const EXT: &str = "json";

#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path of a role's document.
    pub fn path_for(&self, role: &str) -> StoreResult<PathBuf> {
        check_role(role)?;
        Ok(self.root.join(format!("{role}.{EXT}")))
    }

    /// Atomically write a role's document.
    pub fn write(&self, role: &str, bytes: &[u8]) -> StoreResult<PathBuf> {
        let dest = self.path_for(role)?;
        let tmp = self.root.join(format!(".{role}.{EXT}.tmp"));

        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(bytes)?;
            f.sync_all()?;
        }
        if let Err(e) = fs::rename(&tmp, &dest) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        tracing::debug!(role, path = %dest.display(), bytes = bytes.len(), "wrote document");
        Ok(dest)
    }

    pub fn read(&self, role: &str) -> StoreResult<Vec<u8>> {
        let p = self.path_for(role)?;
        if !p.exists() {
            return Err(StoreError::NotFound(role.to_string()));
        }
        Ok(fs::read(p)?)
    }

    /// Read and decode a stored envelope.
    pub fn load<T: DeserializeOwned>(&self, role: &str) -> StoreResult<Metadata<T>> {
        let bytes = self.read(role)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Role names present in the store, sorted.
    pub fn list_roles(&self) -> StoreResult<Vec<String>> {
        let mut roles = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let p = entry.path();
            if p.extension().and_then(|e| e.to_str()) != Some(EXT) {
                continue;
            }
            if let Some(stem) = p.file_stem().and_then(|s| s.to_str()) {
                if check_role(stem).is_ok() {
                    roles.push(stem.to_string());
                }
            }
        }
        roles.sort();
        Ok(roles)
    }
}

impl MetadataStore for FsStore {
    fn store(&self, role: &str, bytes: &[u8]) -> HashbinResult<()> {
        self.write(role, bytes)
            .map(|_| ())
            .map_err(|e| e.into_persistence(role))
    }
}
