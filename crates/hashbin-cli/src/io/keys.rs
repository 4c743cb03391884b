use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use hashbin_core::keys::KeyPair;

/// Seed file of the delegating ("bins") role key.
pub const PARENT_KEY_FILE: &str = "bins.key";
/// Seed file of the key shared by every bin role.
pub const BIN_KEY_FILE: &str = "bin-n.key";

pub fn write_key(path: &Path, key: &KeyPair, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(anyhow!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("{}\n", key.to_seed_hex()))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn read_key(path: &Path) -> Result<KeyPair> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read key {}", path.display()))?;
    KeyPair::from_seed_hex(&raw).with_context(|| format!("invalid key file {}", path.display()))
}

/// Load `(parent, bin)` keys from a keygen directory.
pub fn load_pair(dir: &Path) -> Result<(KeyPair, KeyPair)> {
    Ok((
        read_key(&dir.join(PARENT_KEY_FILE))?,
        read_key(&dir.join(BIN_KEY_FILE))?,
    ))
}
